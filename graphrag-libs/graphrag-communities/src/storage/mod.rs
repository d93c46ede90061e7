pub mod file_table_store;
pub mod memory_table_store;
pub mod table_store;
pub mod tables;
