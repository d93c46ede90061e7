pub mod config;
pub mod error;
pub mod flows;
pub mod input;
pub mod models;
pub mod storage;
pub mod workflows;
