use graphrag_communities::{
    config::WorkflowConfig,
    error::TableStoreError,
    flows::create_final_communities::COMMUNITY_COLUMNS,
    input::loaders::dfs::{parse_list_literal, read_relationship_edges},
    storage::{
        file_table_store::FileTableStore,
        memory_table_store::MemoryTableStore,
        table_store::{TableContent, TableStore},
        tables::{load_table_from_storage, write_table_to_storage, TableFormat},
    },
    workflows::create_final_communities::run_create_final_communities,
};

const ENTITY_NODES_JSON: &str = r#"[
    {"title": "A", "id": "e1"},
    {"title": "B", "id": "e2"},
    {"title": "C", "id": "e3"}
]"#;

const RELATIONSHIP_EDGES_JSON: &str = r#"[
    {"id": "r1", "source": "A", "target": "B", "text_unit_ids": ["t2", "t1"]},
    {"id": "r2", "source": "B", "target": "C", "text_unit_ids": ["t3"]}
]"#;

const COMMUNITIES_JSON: &str = r#"[
    {"title": "A", "community": 10, "level": 0},
    {"title": "B", "community": 10, "level": 0},
    {"title": "C", "community": 20, "level": 0}
]"#;

fn json_config(output_table: &str) -> WorkflowConfig {
    WorkflowConfig {
        entity_nodes_table: "entity_nodes.json".to_string(),
        relationship_edges_table: "relationship_edges.json".to_string(),
        communities_table: "communities.json".to_string(),
        output_table: output_table.to_string(),
        ..WorkflowConfig::default()
    }
}

async fn seed_json_tables(store: &dyn TableStore) {
    store
        .set("entity_nodes.json", TableContent::Text(ENTITY_NODES_JSON.to_string()))
        .await
        .unwrap();
    store
        .set("relationship_edges.json", TableContent::Text(RELATIONSHIP_EDGES_JSON.to_string()))
        .await
        .unwrap();
    store
        .set("communities.json", TableContent::Text(COMMUNITIES_JSON.to_string()))
        .await
        .unwrap();
}

#[test]
fn table_format_follows_the_last_extension() {
    assert_eq!(TableFormat::from_table_name("nodes.parquet"), Some(TableFormat::Parquet));
    assert_eq!(TableFormat::from_table_name("archive.csv.json"), Some(TableFormat::Json));
    assert_eq!(TableFormat::from_table_name("edges.csv"), Some(TableFormat::Csv));
    assert_eq!(TableFormat::from_table_name("edges.xlsx"), None);
    assert_eq!(TableFormat::from_table_name("parquet"), Some(TableFormat::Parquet));
    assert_eq!(TableFormat::from_table_name("edges"), None);
}

#[test]
fn list_literals_from_text_cells_are_parsed() {
    assert_eq!(parse_list_literal(r#"["t1", "t2"]"#), vec!["t1", "t2"]);
    assert_eq!(parse_list_literal("['t1', 't2']"), vec!["t1", "t2"]);
    assert_eq!(parse_list_literal("[]"), Vec::<String>::new());
    assert_eq!(parse_list_literal("t1"), vec!["t1"]);
    assert_eq!(parse_list_literal("  "), Vec::<String>::new());
}

#[tokio::test]
async fn missing_table_fails_before_decoding() {
    let store = MemoryTableStore::new();

    let err = load_table_from_storage("absent.parquet", &store).await.unwrap_err();

    assert!(matches!(err, TableStoreError::MissingTable { ref name } if name == "absent.parquet"));
}

#[tokio::test]
async fn unknown_extension_is_rejected() {
    let store = MemoryTableStore::new();
    store
        .set("nodes.xlsx", TableContent::Bytes(vec![1, 2, 3]))
        .await
        .unwrap();

    let err = load_table_from_storage("nodes.xlsx", &store).await.unwrap_err();

    assert!(matches!(err, TableStoreError::UnsupportedFormat { .. }));
    assert_eq!(err.table_name(), "nodes.xlsx");
}

#[tokio::test]
async fn malformed_content_surfaces_as_a_decode_error() {
    let store = MemoryTableStore::new();
    store
        .set("nodes.parquet", TableContent::Bytes(b"definitely not parquet".to_vec()))
        .await
        .unwrap();

    let err = load_table_from_storage("nodes.parquet", &store).await.unwrap_err();

    assert!(matches!(err, TableStoreError::Decode { ref name, .. } if name == "nodes.parquet"));
}

#[tokio::test]
async fn json_tables_decode_as_a_single_records_array() {
    let store = MemoryTableStore::new();
    seed_json_tables(&store).await;

    let df = load_table_from_storage("relationship_edges.json", &store).await.unwrap();
    let edges = read_relationship_edges(df, "id", "source", "target", Some("text_unit_ids")).unwrap();

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].text_unit_ids, vec!["t2", "t1"]);
}

#[tokio::test]
async fn empty_json_tables_yield_an_empty_rollup() {
    let store = MemoryTableStore::new();
    for name in ["entity_nodes.json", "relationship_edges.json", "communities.json"] {
        store.set(name, TableContent::Text(" [ ]\n".to_string())).await.unwrap();
    }

    let empty = load_table_from_storage("communities.json", &store).await.unwrap();
    assert_eq!(empty.height(), 0);

    let output = run_create_final_communities(&store, &json_config("final_communities.parquet"))
        .await
        .unwrap();

    assert_eq!(output.height(), 0);
    assert_eq!(output.get_column_names(), COMMUNITY_COLUMNS.to_vec());
    assert!(store.has("final_communities.parquet").await.unwrap());
}

#[tokio::test]
async fn csv_tables_with_list_literals_feed_the_workflow() {
    let store = MemoryTableStore::new();
    store
        .set(
            "entity_nodes.csv",
            TableContent::Text("title,id\nA,1\nB,2\nC,3\n".to_string()),
        )
        .await
        .unwrap();
    store
        .set(
            "relationship_edges.csv",
            TableContent::Text("id,source,target,text_unit_ids\nr1,A,B,\"['t1', 't2']\"\n".to_string()),
        )
        .await
        .unwrap();
    store
        .set(
            "communities.csv",
            TableContent::Text("title,community,level\nA,10,0\nB,10,0\nC,20,0\n".to_string()),
        )
        .await
        .unwrap();

    let config = WorkflowConfig {
        entity_nodes_table: "entity_nodes.csv".to_string(),
        relationship_edges_table: "relationship_edges.csv".to_string(),
        communities_table: "communities.csv".to_string(),
        output_table: "final_communities.csv".to_string(),
        ..WorkflowConfig::default()
    };

    let output = run_create_final_communities(&store, &config).await.unwrap();

    assert_eq!(output.height(), 1);
    let written = store.get("final_communities.csv", false).await.unwrap().into_text().unwrap();
    let header = written.lines().next().unwrap();
    assert_eq!(header, COMMUNITY_COLUMNS.join(","));
    assert!(written.contains("Community 10"));
}

#[tokio::test]
async fn workflow_round_trips_through_parquet_output() {
    let store = MemoryTableStore::new();
    seed_json_tables(&store).await;

    let output = run_create_final_communities(&store, &json_config("final_communities.parquet"))
        .await
        .unwrap();
    let reloaded = load_table_from_storage("final_communities.parquet", &store).await.unwrap();

    assert_eq!(output.height(), 1);
    assert_eq!(reloaded.get_column_names(), COMMUNITY_COLUMNS.to_vec());
    assert_eq!(reloaded.column("size").unwrap().i64().unwrap().get(0), Some(2));
    assert_eq!(
        reloaded.column("id").unwrap().str().unwrap().get(0),
        output.column("id").unwrap().str().unwrap().get(0)
    );
}

#[tokio::test]
async fn workflow_reports_the_missing_input_table() {
    let store = MemoryTableStore::new();
    store
        .set("entity_nodes.json", TableContent::Text(ENTITY_NODES_JSON.to_string()))
        .await
        .unwrap();

    let err = run_create_final_communities(&store, &json_config("final_communities.json"))
        .await
        .unwrap_err();

    let err = err.downcast_ref::<TableStoreError>().unwrap();
    assert!(matches!(err, TableStoreError::MissingTable { name } if name == "relationship_edges.json"));
    assert!(!store.has("final_communities.json").await.unwrap());
}

#[tokio::test]
async fn file_store_persists_tables_under_its_root() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkflowConfig {
        storage_dir: dir.path().to_path_buf(),
        ..json_config("final/communities.json")
    };
    let store = FileTableStore::from_config(&config);
    seed_json_tables(&store).await;

    let output = run_create_final_communities(&store, &config).await.unwrap();

    assert_eq!(output.height(), 1);
    assert!(dir.path().join("final/communities.json").exists());

    let mut reloaded = load_table_from_storage("final/communities.json", &store).await.unwrap();
    assert_eq!(reloaded.height(), 1);

    write_table_to_storage("copy.parquet", &mut reloaded, &store).await.unwrap();
    assert!(store.has("copy.parquet").await.unwrap());
}

#[test]
fn default_config_points_at_the_base_index_tables() {
    let config = WorkflowConfig::default();

    assert_eq!(config.entity_nodes_table, "create_base_entity_nodes.parquet");
    assert_eq!(config.relationship_edges_table, "create_base_relationship_edges.parquet");
    assert_eq!(config.communities_table, "create_base_communities.parquet");
    assert_eq!(config.output_table, "create_final_communities.parquet");
}
