pub mod create_final_communities;
pub mod relational;
