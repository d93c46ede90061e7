use std::{env, path::PathBuf};

pub const DEFAULT_ENTITY_NODES_TABLE: &str = "create_base_entity_nodes.parquet";
pub const DEFAULT_RELATIONSHIP_EDGES_TABLE: &str = "create_base_relationship_edges.parquet";
pub const DEFAULT_COMMUNITIES_TABLE: &str = "create_base_communities.parquet";
pub const DEFAULT_OUTPUT_TABLE: &str = "create_final_communities.parquet";

/// Table names read and written by the final communities workflow. The extension of each
/// name selects its storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub storage_dir: PathBuf,
    pub entity_nodes_table: String,
    pub relationship_edges_table: String,
    pub communities_table: String,
    pub output_table: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./output"),
            entity_nodes_table: DEFAULT_ENTITY_NODES_TABLE.to_string(),
            relationship_edges_table: DEFAULT_RELATIONSHIP_EDGES_TABLE.to_string(),
            communities_table: DEFAULT_COMMUNITIES_TABLE.to_string(),
            output_table: DEFAULT_OUTPUT_TABLE.to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_dir = env::var("GRAPHRAG_COMMUNITIES_STORAGE_DIR")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        Self {
            storage_dir,
            entity_nodes_table: table_name_from_env(
                "GRAPHRAG_COMMUNITIES_ENTITY_NODES_TABLE",
                defaults.entity_nodes_table,
            ),
            relationship_edges_table: table_name_from_env(
                "GRAPHRAG_COMMUNITIES_RELATIONSHIP_EDGES_TABLE",
                defaults.relationship_edges_table,
            ),
            communities_table: table_name_from_env(
                "GRAPHRAG_COMMUNITIES_COMMUNITIES_TABLE",
                defaults.communities_table,
            ),
            output_table: table_name_from_env("GRAPHRAG_COMMUNITIES_OUTPUT_TABLE", defaults.output_table),
        }
    }
}

fn table_name_from_env(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}
