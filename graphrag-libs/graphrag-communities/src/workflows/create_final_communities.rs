use polars::frame::DataFrame;
use tracing::info;

use crate::{
    config::WorkflowConfig,
    flows::create_final_communities::create_final_communities,
    storage::{
        table_store::TableStore,
        tables::{load_table_from_storage, write_table_to_storage},
    },
};

/// Loads the three base tables from `store`, builds the final communities table and writes
/// it back under `config.output_table`.
pub async fn run_create_final_communities(
    store: &dyn TableStore,
    config: &WorkflowConfig,
) -> anyhow::Result<DataFrame> {
    let base_entity_nodes = load_table_from_storage(&config.entity_nodes_table, store).await?;
    let base_relationship_edges = load_table_from_storage(&config.relationship_edges_table, store).await?;
    let base_communities = load_table_from_storage(&config.communities_table, store).await?;

    let mut output =
        create_final_communities(&base_entity_nodes, &base_relationship_edges, &base_communities)?;
    write_table_to_storage(&config.output_table, &mut output, store).await?;

    info!("workflow create_final_communities wrote {}", config.output_table);
    Ok(output)
}
