//! Retrieval orchestration against the in-process store and scripted model.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use ragweave::retrieval::{RetrievalConfig, RetrievalOrchestrator};
use ragweave::stores::{MemoryVectorStore, QueryResponse, StoredChunks, VectorStore};
use ragweave::types::RagError;
use ragweave::MockGenerativeModel;

fn fast_config() -> RetrievalConfig {
    RetrievalConfig {
        rewrite_backoff: Duration::from_millis(1),
        ..RetrievalConfig::default()
    }
}

async fn seeded_store() -> Arc<MemoryVectorStore> {
    let store = Arc::new(MemoryVectorStore::new());
    store
        .upsert(
            vec![
                "Handbook-0".to_string(),
                "Handbook-1".to_string(),
                "Recipes-0".to_string(),
            ],
            vec![
                "rust borrow checker rules and ownership".to_string(),
                "rust async runtimes and tasks".to_string(),
                "baking sourdough bread at home".to_string(),
            ],
            vec![
                json!({"doc_id": "doc-handbook", "title": "Handbook", "source_url": "https://example.com/handbook"}),
                json!({"doc_id": "doc-handbook", "title": "Handbook", "source_url": "https://example.com/handbook"}),
                json!({"doc_id": "doc-recipes", "title": "Recipes", "source_url": "https://example.com/recipes"}),
            ],
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn successful_rewrite_widens_the_search_and_dedups_results() {
    let store = seeded_store().await;
    let model = Arc::new(MockGenerativeModel::new());
    model.push_response("rust ownership rules\nborrow checker explained\nhow rust tracks ownership");

    let orchestrator =
        RetrievalOrchestrator::new(store, model.clone()).with_config(fast_config());
    let outcome = orchestrator
        .process_query("how does the borrow checker work?")
        .await
        .unwrap();

    assert_eq!(outcome.rewritten_queries.len(), 4);
    assert_eq!(
        outcome.rewritten_queries[0],
        "how does the borrow checker work?"
    );

    // Four phrasings times top-7 over three chunks: dedup must collapse to
    // the three unique ids, parallel arrays intact.
    let unique: HashSet<&String> = outcome.retrieved.ids.iter().collect();
    assert_eq!(unique.len(), outcome.retrieved.ids.len());
    assert_eq!(outcome.retrieved.ids.len(), outcome.retrieved.documents.len());
    assert_eq!(outcome.retrieved.ids.len(), outcome.retrieved.metadatas.len());
    assert_eq!(outcome.retrieved.ids.len(), 3);

    assert!(outcome.user_prompt.contains("Context:"));
    assert!(outcome.user_prompt.contains("Metadata:"));
    assert!(
        outcome
            .user_prompt
            .ends_with("Original Query: how does the borrow checker work?\n"),
        "user prompt must end with the original, non-rewritten query"
    );
    assert!(outcome.system_prompt.contains("relevance score"));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn rewrite_failure_degrades_to_the_original_query_after_three_attempts() {
    let store = seeded_store().await;
    let model = Arc::new(MockGenerativeModel::new());
    model.push_failure("upstream overloaded");
    model.push_failure("upstream overloaded");
    model.push_failure("upstream overloaded");

    let orchestrator =
        RetrievalOrchestrator::new(store, model.clone()).with_config(fast_config());
    let outcome = orchestrator
        .process_query("rust async runtimes")
        .await
        .unwrap();

    assert_eq!(model.call_count(), 3, "exactly three rewrite attempts");
    assert_eq!(
        outcome.rewritten_queries,
        vec!["rust async runtimes".to_string()]
    );
    // Retrieval proceeded with the single-query search.
    assert!(!outcome.retrieved.is_empty());
    assert_eq!(outcome.retrieved.ids[0], "Handbook-1");
}

/// A store whose query path always fails.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn get(&self, _limit: Option<usize>) -> Result<StoredChunks, RagError> {
        Ok(StoredChunks::default())
    }

    async fn upsert(
        &self,
        _ids: Vec<String>,
        _documents: Vec<String>,
        _metadatas: Vec<serde_json::Value>,
    ) -> Result<(), RagError> {
        Ok(())
    }

    async fn delete(&self, _ids: Vec<String>) -> Result<(), RagError> {
        Ok(())
    }

    async fn query(
        &self,
        _query_texts: Vec<String>,
        _n_results: usize,
    ) -> Result<QueryResponse, RagError> {
        Err(RagError::Storage("connection refused".to_string()))
    }
}

#[tokio::test]
async fn store_failure_degrades_to_an_empty_evidence_set() {
    let model = Arc::new(MockGenerativeModel::new());
    model.push_response("phrasing one\nphrasing two");

    let orchestrator =
        RetrievalOrchestrator::new(Arc::new(BrokenStore), model).with_config(fast_config());
    let outcome = orchestrator.process_query("anything at all").await.unwrap();

    assert!(outcome.retrieved.is_empty());
    assert!(outcome.user_prompt.contains("Original Query: anything at all"));
}

#[tokio::test]
async fn empty_queries_are_rejected_before_any_work() {
    let store = seeded_store().await;
    let model = Arc::new(MockGenerativeModel::new());
    let orchestrator =
        RetrievalOrchestrator::new(store, model.clone()).with_config(fast_config());

    let result = orchestrator.process_query("   ").await;
    assert!(matches!(result, Err(RagError::InvalidDocument(_))));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn first_seen_metadata_wins_for_chunks_found_by_multiple_phrasings() {
    // Two phrasings retrieving the same chunk: the memory store returns it in
    // both groups, so dedup must keep the group-one copy.
    let store = Arc::new(MemoryVectorStore::new());
    store
        .upsert(
            vec!["Report-2".to_string()],
            vec!["annual revenue figures".to_string()],
            vec![json!({"doc_id": "doc-report", "title": "Report"})],
        )
        .await
        .unwrap();

    let model = Arc::new(MockGenerativeModel::new());
    model.push_response("revenue numbers by year");

    let orchestrator = RetrievalOrchestrator::new(store, model).with_config(fast_config());
    let outcome = orchestrator.process_query("annual revenue").await.unwrap();

    assert_eq!(outcome.rewritten_queries.len(), 2);
    let occurrences = outcome
        .retrieved
        .ids
        .iter()
        .filter(|id| id.as_str() == "Report-2")
        .count();
    assert_eq!(occurrences, 1, "Report-2 must appear exactly once");
}
