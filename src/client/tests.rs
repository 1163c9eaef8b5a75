use super::*;
use crate::embedding::HashedEmbedder;
use crate::vector_db::{DistanceMetric, InMemoryVectorStore, QueryMatch, StoredRecord};
use std::fs;
use tempfile::TempDir;

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.vector_db.backend = "memory".to_string();
    config.vector_db.lancedb_path = temp_dir.path().join("db");
    config.embedding.provider = "hashed".to_string();
    config.embedding.dimension = Some(128);
    config.locks.lock_dir = temp_dir.path().join("locks");
    config.locks.wait_timeout_secs = 2;
    config
}

// Helper to create a test client over an in-memory store
async fn create_test_client() -> (RagClient, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let client = RagClient::with_config(test_config(&temp_dir)).await.unwrap();
    (client, temp_dir)
}

fn write_tree(root: &std::path::Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("styles")).unwrap();
    fs::write(
        root.join("src/app.js"),
        "function handleClick() { doThing(); }\n",
    )
    .unwrap();
    fs::write(
        root.join("styles/main.css"),
        ".btn-primary { color: red; }\n.card {\n  padding: 0;\n}\n",
    )
    .unwrap();
}

fn analyze(repo: &str, path: &std::path::Path, force_refresh: bool) -> AnalyzeRequest {
    AnalyzeRequest {
        repo: repo.to_string(),
        path: path.to_string_lossy().to_string(),
        force_refresh,
    }
}

fn search(query: &str, repo: Option<&str>) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        repo: repo.map(String::from),
        limit: 10,
        min_score: 0.0,
    }
}

// ===== Client Initialization Tests =====

#[tokio::test]
async fn test_with_config_memory_backend() {
    let (client, _temp_dir) = create_test_client().await;
    assert_eq!(client.embedding_dimension(), 128);
    assert_eq!(client.config().vector_db.backend, "memory");
    let _cloned = client.clone();
}

#[tokio::test]
async fn test_with_config_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    config.vector_db.distance = "l2".to_string();
    assert!(RagClient::with_config(config).await.is_err());
}

#[tokio::test]
async fn test_with_components_rejects_metric_mismatch() {
    struct DotStore(InMemoryVectorStore);

    #[async_trait::async_trait]
    impl VectorStore for DotStore {
        async fn initialize(&self, dimension: usize) -> anyhow::Result<()> {
            self.0.initialize(dimension).await
        }
        async fn upsert(&self, records: Vec<StoredRecord>) -> anyhow::Result<usize> {
            self.0.upsert(records).await
        }
        async fn get(
            &self,
            filter: &RecordFilter,
            limit: Option<usize>,
        ) -> anyhow::Result<Vec<StoredEntry>> {
            self.0.get(filter, limit).await
        }
        async fn query(
            &self,
            vector: Vec<f32>,
            k: usize,
            filter: &RecordFilter,
        ) -> anyhow::Result<Vec<QueryMatch>> {
            self.0.query(vector, k, filter).await
        }
        async fn delete(&self, keys: &[String]) -> anyhow::Result<usize> {
            self.0.delete(keys).await
        }
        async fn count(&self) -> anyhow::Result<usize> {
            self.0.count().await
        }
        async fn clear(&self) -> anyhow::Result<()> {
            self.0.clear().await
        }
        fn distance_metric(&self) -> DistanceMetric {
            DistanceMetric::Dot
        }
        fn collection_name(&self) -> &str {
            "dot"
        }
    }

    let temp_dir = TempDir::new().unwrap();
    let result = RagClient::with_components(
        test_config(&temp_dir),
        Arc::new(HashedEmbedder::new(8)),
        Arc::new(DotStore(InMemoryVectorStore::default())),
    )
    .await;
    assert!(matches!(
        result,
        Err(RagError::VectorDb(VectorDbError::UnsupportedMetric(_)))
    ));
}

// ===== analyze_repository Tests =====

#[tokio::test]
async fn test_analyze_and_search() {
    let (client, temp_dir) = create_test_client().await;
    let tree = temp_dir.path().join("tree");
    write_tree(&tree);

    let response = client
        .analyze_repository(analyze("acme/web", &tree, false))
        .await
        .unwrap();
    assert_eq!(response.repo, "acme/web");
    assert_eq!(response.files_scanned, 2);
    // handleClick matches both the react_component and function rules
    assert_eq!(response.sections_found, 4);
    assert_eq!(response.indexing.indexed, 4);
    assert_eq!(response.indexing.collection_size, 4);
    assert_eq!(response.summary.total_sections, 4);
    assert_eq!(response.summary.files_analyzed, 2);
    assert_eq!(response.summary.section_types.get("css_class"), Some(&2));

    let found = client
        .search_sections(search("click handler", Some("acme/web")))
        .await
        .unwrap();
    assert!(found.results_count > 0);
    assert_eq!(found.repo_filter.as_deref(), Some("acme/web"));
    let hit = found
        .results
        .iter()
        .find(|r| r.metadata.name == "handleClick")
        .unwrap();
    assert!(hit.score > 0.0);
    assert_eq!(hit.metadata.start_line, 1);
}

#[tokio::test]
async fn test_reanalyze_is_idempotent() {
    let (client, temp_dir) = create_test_client().await;
    let tree = temp_dir.path().join("tree");
    write_tree(&tree);

    client
        .analyze_repository(analyze("acme/web", &tree, false))
        .await
        .unwrap();
    let second = client
        .analyze_repository(analyze("acme/web", &tree, false))
        .await
        .unwrap();
    assert_eq!(second.indexing.indexed, 0);
    assert_eq!(second.indexing.skipped, 4);
    assert_eq!(second.indexing.collection_size, 4);
}

#[tokio::test]
async fn test_force_refresh_purges_first() {
    let (client, temp_dir) = create_test_client().await;
    let tree = temp_dir.path().join("tree");
    write_tree(&tree);

    client
        .analyze_repository(analyze("acme/web", &tree, false))
        .await
        .unwrap();

    // Changed file: old sections become stale
    fs::write(tree.join("src/app.js"), "function onSubmit() { send(); }\n").unwrap();
    let refreshed = client
        .analyze_repository(analyze("acme/web", &tree, true))
        .await
        .unwrap();
    assert_eq!(refreshed.sections_purged, 4);
    assert_eq!(refreshed.indexing.indexed, 4);
    assert_eq!(refreshed.indexing.collection_size, 4);

    let sections = client.repository_sections("acme/web", None).await.unwrap();
    assert!(sections.iter().all(|s| s.metadata.name != "handleClick"));
}

#[tokio::test]
async fn test_analyze_validation_errors() {
    let (client, temp_dir) = create_test_client().await;

    let bad_repo = client
        .analyze_repository(analyze("bad repo", temp_dir.path(), false))
        .await;
    assert!(matches!(
        bad_repo,
        Err(RagError::Validation(ValidationError::InvalidRepoId { .. }))
    ));

    let missing = client
        .analyze_repository(analyze(
            "acme/web",
            std::path::Path::new("/nonexistent/section-rag/tree"),
            false,
        ))
        .await;
    assert!(matches!(
        missing,
        Err(RagError::Validation(ValidationError::PathNotFound(_)))
    ));
}

#[tokio::test]
async fn test_analyze_file_root_is_rejected() {
    let (client, temp_dir) = create_test_client().await;
    let file = temp_dir.path().join("single.js");
    fs::write(&file, "function a() {}").unwrap();

    let result = client
        .analyze_repository(analyze("acme/web", &file, false))
        .await;
    assert!(matches!(result, Err(RagError::Extraction(_))));
}

// ===== search_sections Tests =====

#[tokio::test]
async fn test_search_validation() {
    let (client, _temp_dir) = create_test_client().await;

    let empty = client.search_sections(search("   ", None)).await;
    assert!(matches!(
        empty,
        Err(RagError::Validation(ValidationError::Empty(_)))
    ));

    let mut bad_score = search("button", None);
    bad_score.min_score = 1.5;
    assert!(client.search_sections(bad_score).await.is_err());

    let mut zero_limit = search("button", None);
    zero_limit.limit = 0;
    assert!(client.search_sections(zero_limit).await.is_err());
}

#[tokio::test]
async fn test_search_empty_collection() {
    let (client, _temp_dir) = create_test_client().await;
    let response = client.search_sections(search("button", None)).await.unwrap();
    assert_eq!(response.results_count, 0);
    assert!(response.repo_filter.is_none());
}

// ===== Repository management Tests =====

#[tokio::test]
async fn test_sections_summary_delete_and_stats() {
    let (client, temp_dir) = create_test_client().await;
    let tree = temp_dir.path().join("tree");
    write_tree(&tree);

    client
        .analyze_repository(analyze("acme/web", &tree, false))
        .await
        .unwrap();
    client
        .analyze_repository(analyze("acme/api", &tree, false))
        .await
        .unwrap();

    let sections = client.repository_sections("acme/web", None).await.unwrap();
    assert_eq!(sections.len(), 4);
    assert!(sections.iter().all(|s| s.metadata.repo == "acme/web"));

    let limited = client
        .repository_sections("acme/web", Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    let summary = client.repository_summary("acme/web").await.unwrap();
    assert_eq!(summary.repository, "acme/web");
    assert_eq!(summary.total_sections, 4);
    assert_eq!(summary.files_analyzed, 2);
    assert_eq!(
        summary.file_structure.get("styles/main.css"),
        Some(&vec!["btn-primary".to_string(), "card".to_string()])
    );

    let stats = client.statistics().await.unwrap();
    assert_eq!(stats.total_sections, 8);
    assert_eq!(stats.repositories, vec!["acme/api", "acme/web"]);
    assert_eq!(stats.repository_count, 2);
    assert_eq!(stats.collection_name, "codebase_sections");

    let deleted = client.delete_repository("acme/web").await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.sections_deleted, 4);
    assert!(
        client
            .repository_sections("acme/web", None)
            .await
            .unwrap()
            .is_empty()
    );

    let cleared = client.clear_all().await;
    assert!(cleared.success);
    assert_eq!(cleared.sections_deleted, 4);
    assert_eq!(client.statistics().await.unwrap().total_sections, 0);
}

#[tokio::test]
async fn test_unknown_repository_is_empty() {
    let (client, _temp_dir) = create_test_client().await;
    assert!(
        client
            .repository_sections("nobody/nothing", None)
            .await
            .unwrap()
            .is_empty()
    );
    let summary = client.repository_summary("nobody/nothing").await.unwrap();
    assert_eq!(summary.total_sections, 0);
    assert!(summary.file_structure.is_empty());

    let deleted = client.delete_repository("nobody/nothing").await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.sections_deleted, 0);
}

#[tokio::test]
async fn test_management_validates_repo_ids() {
    let (client, _temp_dir) = create_test_client().await;
    assert!(client.repository_sections("", None).await.is_err());
    assert!(client.repository_summary("a'b").await.is_err());
    assert!(client.delete_repository("two words").await.is_err());
}
