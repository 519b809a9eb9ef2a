//! Multi-query retrieval orchestration.
//!
//! One user question fans out into several phrasings, each phrasing runs a
//! nearest-neighbour search, and the union is deduplicated by chunk identity
//! into a single ranked evidence set plus a grounded prompt pair. The
//! orchestrator holds no state across requests.
//!
//! Failure posture: query rewriting retries with linear backoff and then
//! degrades to the original query alone; a failed store query degrades to an
//! empty evidence set. A user question never produces a hard retrieval error.

pub mod prompts;

pub use prompts::{ANSWER_SYSTEM_PROMPT, REWRITER_PROMPT};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::providers::{GenerateRequest, GenerativeModel};
use crate::stores::{QueryResponse, VectorStore};
use crate::types::RagError;

/// Tunables for one orchestrator instance.
#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    /// Nearest neighbours requested per rewritten query.
    pub results_per_query: usize,
    /// Total attempts for the query-rewriting call.
    pub rewrite_max_attempts: u32,
    /// Base delay between rewrite attempts; attempt `n` waits `base * n`.
    pub rewrite_backoff: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            results_per_query: 7,
            rewrite_max_attempts: 3,
            rewrite_backoff: Duration::from_millis(1000),
        }
    }
}

impl From<&RagConfig> for RetrievalConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            results_per_query: config.results_per_query,
            ..Self::default()
        }
    }
}

/// Deduplicated evidence across all rewritten-query searches.
///
/// Parallel arrays in stable first-seen order; `ids` contains no duplicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEvidence {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Value>,
}

impl RetrievedEvidence {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Everything the generation layer needs to answer one question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub rewritten_queries: Vec<String>,
    pub retrieved: RetrievedEvidence,
    pub user_prompt: String,
    pub system_prompt: String,
}

/// Per-request retrieval pipeline: rewrite → multi-query search → dedup →
/// prompt assembly.
pub struct RetrievalOrchestrator {
    store: Arc<dyn VectorStore>,
    model: Arc<dyn GenerativeModel>,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(store: Arc<dyn VectorStore>, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            store,
            model,
            config: RetrievalConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the full retrieval pipeline for one user question.
    ///
    /// Only an empty question is an error; every downstream failure degrades
    /// into a smaller (possibly empty) evidence set.
    pub async fn process_query(&self, query: &str) -> Result<QueryOutcome, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidDocument("query must not be empty".to_string()));
        }

        let rewritten_queries = self.rewrite_query(query).await;
        let retrieved = self.similarity_search(&rewritten_queries).await;
        let user_prompt = build_user_prompt(query, &retrieved);

        Ok(QueryOutcome {
            rewritten_queries,
            retrieved,
            user_prompt,
            system_prompt: ANSWER_SYSTEM_PROMPT.to_string(),
        })
    }

    /// Expands the query into alternative phrasings, the original always
    /// first. Degrades to `[original]` after all attempts fail.
    async fn rewrite_query(&self, query: &str) -> Vec<String> {
        let request = GenerateRequest::new()
            .with_system(REWRITER_PROMPT)
            .with_text(query);

        for attempt in 1..=self.config.rewrite_max_attempts {
            match self.model.generate(request.clone()).await {
                Ok(text) => {
                    let mut queries = vec![query.to_string()];
                    queries.extend(
                        text.lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty())
                            .map(str::to_string),
                    );
                    debug!(count = queries.len(), "query rewrite succeeded");
                    return queries;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "query rewrite failed");
                    if attempt < self.config.rewrite_max_attempts {
                        sleep(self.config.rewrite_backoff * attempt).await;
                    }
                }
            }
        }
        vec![query.to_string()]
    }

    /// One batched store query over every phrasing, deduplicated by chunk id.
    /// Store failure degrades to an empty evidence set.
    async fn similarity_search(&self, rewritten_queries: &[String]) -> RetrievedEvidence {
        match self
            .store
            .query(rewritten_queries.to_vec(), self.config.results_per_query)
            .await
        {
            Ok(response) => deduplicate(response),
            Err(err) => {
                warn!(error = %err, "similarity search failed, continuing without context");
                RetrievedEvidence::default()
            }
        }
    }
}

/// Collapses per-query result groups into unique evidence. Groups are walked
/// in submission order; the first occurrence of a chunk id wins, so the
/// highest-priority phrasing supplies the retained content and metadata.
fn deduplicate(response: QueryResponse) -> RetrievedEvidence {
    let mut seen = HashSet::new();
    let mut evidence = RetrievedEvidence::default();

    for (group_index, id_group) in response.ids.iter().enumerate() {
        for (item_index, id) in id_group.iter().enumerate() {
            if !seen.insert(id.clone()) {
                continue;
            }
            evidence.ids.push(id.clone());
            evidence.documents.push(
                response
                    .documents
                    .get(group_index)
                    .and_then(|group| group.get(item_index))
                    .cloned()
                    .unwrap_or_default(),
            );
            evidence.metadatas.push(
                response
                    .metadatas
                    .get(group_index)
                    .and_then(|group| group.get(item_index))
                    .cloned()
                    .unwrap_or_default(),
            );
        }
    }
    evidence
}

/// Assembles the grounded user prompt: context, metadata side-channel, and
/// the original (non-rewritten) query.
fn build_user_prompt(query: &str, retrieved: &RetrievedEvidence) -> String {
    let metadata = serde_json::to_string_pretty(&retrieved.metadatas)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "Context:\n{}\n\nMetadata:\n{}\n\nOriginal Query: {}\n",
        retrieved.documents.join("\n\n"),
        metadata,
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deduplicate_keeps_first_occurrence_across_groups() {
        let response = QueryResponse {
            ids: vec![
                vec!["Report-2".to_string(), "Report-0".to_string()],
                vec!["Report-2".to_string(), "Guide-1".to_string()],
            ],
            documents: vec![
                vec!["first copy".to_string(), "zero".to_string()],
                vec!["second copy".to_string(), "guide".to_string()],
            ],
            metadatas: vec![
                vec![json!({"from": "query-a"}), json!({})],
                vec![json!({"from": "query-b"}), json!({})],
            ],
            distances: vec![vec![0.1, 0.2], vec![0.15, 0.3]],
        };

        let evidence = deduplicate(response);
        assert_eq!(evidence.ids, vec!["Report-2", "Report-0", "Guide-1"]);
        assert_eq!(evidence.documents[0], "first copy");
        assert_eq!(evidence.metadatas[0], json!({"from": "query-a"}));
        assert_eq!(evidence.ids.len(), evidence.documents.len());
        assert_eq!(evidence.ids.len(), evidence.metadatas.len());
    }

    #[test]
    fn deduplicate_tolerates_ragged_groups() {
        let response = QueryResponse {
            ids: vec![vec!["a".to_string(), "b".to_string()]],
            documents: vec![vec!["only one".to_string()]],
            metadatas: vec![vec![]],
            distances: vec![vec![]],
        };
        let evidence = deduplicate(response);
        assert_eq!(evidence.ids.len(), 2);
        assert_eq!(evidence.documents[1], "");
        assert_eq!(evidence.metadatas[0], serde_json::Value::Null);
    }

    #[test]
    fn user_prompt_carries_context_metadata_and_original_query() {
        let retrieved = RetrievedEvidence {
            ids: vec!["x-0".to_string()],
            documents: vec!["chunk body".to_string()],
            metadatas: vec![json!({"title": "X"})],
        };
        let prompt = build_user_prompt("what is x?", &retrieved);
        assert!(prompt.contains("Context:\nchunk body"));
        assert!(prompt.contains("\"title\": \"X\""));
        assert!(prompt.ends_with("Original Query: what is x?\n"));
    }
}
