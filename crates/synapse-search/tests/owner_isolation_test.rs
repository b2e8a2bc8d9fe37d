//! Cross-owner isolation and index lifecycle tests.
//!
//! The vector index must never return data across owner boundaries, even
//! when another owner's item has a higher raw similarity score.

mod fixtures;

use uuid::Uuid;

use fixtures::{memory, TestWorld};
use synapse_core::{ContentType, EmbeddingBackend, SearchMode, Vector, VectorIndex};
use synapse_inference::MockEmbeddingGenerator;

#[tokio::test]
async fn vector_query_never_crosses_owner_boundaries() {
    // Two owners with near-identical embeddings; owner A's query must not
    // surface B's item no matter how similar it is.
    let world = TestWorld::new();
    let owner_a = Uuid::now_v7();
    let owner_b = Uuid::now_v7();

    let a_item = memory(owner_a, "Rust async runtimes", ContentType::Article);
    let b_item = memory(owner_b, "Rust async runtimes", ContentType::Article);
    world.memories.seed(a_item.clone());
    world.memories.seed(b_item.clone());

    // B's vector is exactly the query embedding (similarity 1.0); A's is
    // merely close. Isolation must still win over score.
    let query_vector = world.embedder.embed("rust async runtimes").await.unwrap();
    let near_vector = Vector::from(MockEmbeddingGenerator::generate("rust async runtime", 64));

    world
        .index
        .upsert(owner_a, a_item.id, &near_vector, "mock-embed")
        .await
        .unwrap();
    world
        .index
        .upsert(owner_b, b_item.id, &query_vector, "mock-embed")
        .await
        .unwrap();

    let hits = world.index.query(owner_a, &query_vector, 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory_id, a_item.id);

    // End to end through the engine as well.
    let response = world
        .engine()
        .search(owner_a, "rust async runtimes", SearchMode::Semantic, 10)
        .await
        .unwrap();
    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].memory.owner_id, owner_a);
}

#[tokio::test]
async fn upsert_twice_leaves_single_entry() {
    let world = TestWorld::new();
    let owner = Uuid::now_v7();
    let item = memory(owner, "Rust async runtimes", ContentType::Article);
    world.memories.seed(item.clone());

    let vector = world.embedder.embed("rust").await.unwrap();
    world
        .index
        .upsert(owner, item.id, &vector, "mock-embed")
        .await
        .unwrap();
    world
        .index
        .upsert(owner, item.id, &vector, "mock-embed")
        .await
        .unwrap();

    let hits = world.index.query(owner, &vector, 10).await.unwrap();
    assert_eq!(hits.len(), 1, "upsert must be idempotent, not duplicating");
}

#[tokio::test]
async fn upsert_replaces_existing_vector() {
    let world = TestWorld::new();
    let owner = Uuid::now_v7();
    let item = memory(owner, "Rust async runtimes", ContentType::Article);
    world.memories.seed(item.clone());

    let old = world.embedder.embed("completely unrelated text").await.unwrap();
    let new = world.embedder.embed("rust async runtimes").await.unwrap();
    world.index.upsert(owner, item.id, &old, "mock-embed").await.unwrap();
    world.index.upsert(owner, item.id, &new, "mock-embed").await.unwrap();

    let hits = world.index.query(owner, &new, 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(
        hits[0].score > 0.99,
        "query against the replaced vector should be near-identical, got {}",
        hits[0].score
    );
}

#[tokio::test]
async fn remove_is_idempotent() {
    let world = TestWorld::new();
    let owner = Uuid::now_v7();
    let item = memory(owner, "Rust async runtimes", ContentType::Article);
    let vector = world.embedder.embed("rust").await.unwrap();
    world.index.upsert(owner, item.id, &vector, "mock-embed").await.unwrap();

    world.index.remove(item.id).await.unwrap();
    world.index.remove(item.id).await.unwrap();

    let hits = world.index.query(owner, &vector, 10).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn vector_hits_sorted_descending_with_deterministic_ties() {
    let world = TestWorld::new();
    let owner = Uuid::now_v7();
    let vector = world.embedder.embed("anchor").await.unwrap();

    // Two entries with the identical vector tie exactly; order falls back
    // to memory id.
    let first = Uuid::now_v7();
    let second = Uuid::now_v7();
    world.index.upsert(owner, first, &vector, "mock-embed").await.unwrap();
    world.index.upsert(owner, second, &vector, "mock-embed").await.unwrap();

    let run_a = world.index.query(owner, &vector, 10).await.unwrap();
    let run_b = world.index.query(owner, &vector, 10).await.unwrap();

    assert_eq!(run_a.len(), 2);
    let ids_a: Vec<Uuid> = run_a.iter().map(|h| h.memory_id).collect();
    let ids_b: Vec<Uuid> = run_b.iter().map(|h| h.memory_id).collect();
    assert_eq!(ids_a, ids_b, "tie order must be deterministic");
    assert!(ids_a[0] < ids_a[1], "ties break by memory id");
}
