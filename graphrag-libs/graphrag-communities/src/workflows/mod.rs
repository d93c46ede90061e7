pub mod create_final_communities;
