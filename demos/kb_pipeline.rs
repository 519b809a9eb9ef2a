//! End-to-end pipeline walkthrough against in-process fakes.
//!
//! Chunks a small markdown knowledge base, stores it in the memory vector
//! store, then answers a query through the retrieval orchestrator with a
//! scripted rewriter. Everything runs offline:
//!
//! ```bash
//! cargo run --example kb_pipeline
//! ```

use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use ragweave::chunking::{Tokenizer, chunk_markdown};
use ragweave::retrieval::RetrievalOrchestrator;
use ragweave::stores::{MemoryVectorStore, VectorStore};
use ragweave::types::RagError;
use ragweave::MockGenerativeModel;

const HANDBOOK: &str = "\
# Ownership
Every value in Rust has a single owner. When the owner goes out of scope the
value is dropped.

# Borrowing
References borrow a value without taking ownership. At any time you can have
either one mutable reference or any number of immutable references.

# Lifetimes
Lifetimes describe how long references are valid, letting the compiler prove
that no reference outlives the data it points to.
";

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();

    let tokenizer = Tokenizer::new();
    let store = Arc::new(MemoryVectorStore::new());

    // Ingest: chunk the handbook and store it with document metadata.
    let chunks = chunk_markdown(
        &tokenizer,
        HANDBOOK,
        "Rust Handbook",
        "https://example.com/handbook",
        200,
        20,
    );
    println!("chunked handbook into {} chunks", chunks.len());

    let ids = chunks.iter().map(|c| c.id.clone()).collect();
    let documents = chunks.iter().map(|c| c.content.clone()).collect();
    let metadatas = chunks
        .iter()
        .map(|c| {
            serde_json::json!({
                "doc_id": "doc-rust-handbook",
                "title": c.metadata.title,
                "source_url": c.metadata.source,
                "chunk_index": c.metadata.chunk_index,
                "total_chunks": c.metadata.total_chunks,
            })
        })
        .collect();
    store.upsert(ids, documents, metadatas).await?;

    // Query: a scripted rewriter stands in for the generative model.
    let model = Arc::new(MockGenerativeModel::new());
    model.push_response(
        "how does rust decide when values are freed\n\
         rust ownership and drop semantics\n\
         single owner rule in rust",
    );

    let orchestrator = RetrievalOrchestrator::new(store, model);
    let outcome = orchestrator
        .process_query("when does rust free a value?")
        .await?;

    println!("\nrewritten queries:");
    for query in &outcome.rewritten_queries {
        println!("  - {query}");
    }

    println!("\nretrieved {} unique chunks:", outcome.retrieved.len());
    for (id, content) in outcome
        .retrieved
        .ids
        .iter()
        .zip(&outcome.retrieved.documents)
    {
        let preview: String = content.chars().take(60).collect();
        println!("  {id}: {preview}…");
    }

    println!("\n--- user prompt ---\n{}", outcome.user_prompt);
    Ok(())
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
