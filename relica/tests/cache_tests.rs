// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tests for query-result caching through the model pipeline: cache
//! short-circuits, write invalidation, bypass, implicit model defaults,
//! analytics wiring, and the caching/eager-loading layering order.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;

use relica::ModelDef;
use testutils::{rec, TestFixture};

#[tokio::test]
async fn test_warm_read_skips_the_data_source() {
    let fixture = TestFixture::new();
    let id = fixture.create_user("ada").await;

    let cold = fixture
        .orm
        .model("User")
        .unwrap()
        .cache(60)
        .find(id.clone())
        .await
        .unwrap()
        .unwrap();
    let reads_after_cold = fixture.conn.op_counts().reads();

    let warm = fixture
        .orm
        .model("User")
        .unwrap()
        .cache(60)
        .find(id.clone())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(cold, warm);
    // The warm read was served from cache.
    assert_eq!(fixture.conn.op_counts().reads(), reads_after_cold);
}

#[tokio::test]
async fn test_invalidation_after_each_mutating_operation() {
    let fixture = TestFixture::new();
    let users = || fixture.orm.model("User").unwrap().cache(60);

    let id = fixture.create_user("ada").await;

    // Warm the cache for both read groups.
    users().find(id.clone()).await.unwrap();
    users().all().await.unwrap();
    let reads = fixture.conn.op_counts().reads();
    users().find(id.clone()).await.unwrap();
    users().all().await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads);

    // create() drops every cached read for the model.
    fixture.create_user("grace").await;
    let reads = fixture.conn.op_counts().reads();
    users().find(id.clone()).await.unwrap();
    users().all().await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads + 2);

    // update() drops them again.
    fixture
        .orm
        .model("User")
        .unwrap()
        .update(id.clone(), rec(json!({"name": "lovelace"})))
        .await
        .unwrap();
    let reads = fixture.conn.op_counts().reads();
    let found = users().find(id.clone()).await.unwrap().unwrap();
    assert_eq!(found.get("name"), Some(&json!("lovelace")));
    assert_eq!(fixture.conn.op_counts().reads(), reads + 1);

    // delete() (a soft delete here) also invalidates.
    fixture.orm.model("User").unwrap().delete(id.clone()).await.unwrap();
    let reads = fixture.conn.op_counts().reads();
    assert_eq!(users().find(id.clone()).await.unwrap(), None);
    assert_eq!(fixture.conn.op_counts().reads(), reads + 1);
}

#[tokio::test]
async fn test_without_cache_bypasses_even_model_defaults() {
    let fixture = TestFixture::new();
    fixture.orm.register(
        ModelDef::builder("Tag", "tags")
            .connection("memory")
            .default_cache_ttl(120)
            .build(),
    );
    fixture
        .orm
        .model("Tag")
        .unwrap()
        .create(rec(json!({"name": "rust"})))
        .await
        .unwrap();

    // The model default makes plain reads cache implicitly.
    fixture.orm.model("Tag").unwrap().all().await.unwrap();
    let reads = fixture.conn.op_counts().reads();
    fixture.orm.model("Tag").unwrap().all().await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads);

    // Bypass forces the data source.
    fixture.orm.model("Tag").unwrap().without_cache().all().await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads + 1);
}

#[tokio::test]
async fn test_uncached_model_reads_always_hit_the_source() {
    let fixture = TestFixture::new();
    let id = fixture.create_user("ada").await;

    fixture.orm.model("User").unwrap().find(id.clone()).await.unwrap();
    let reads = fixture.conn.op_counts().reads();
    fixture.orm.model("User").unwrap().find(id.clone()).await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads + 1);
}

#[tokio::test]
async fn test_trashed_visibility_has_its_own_cache_entries() {
    let fixture = TestFixture::new();
    let id = fixture.create_user("ada").await;
    fixture.orm.model("User").unwrap().delete(id.clone()).await.unwrap();

    let users = || fixture.orm.model("User").unwrap().cache(60);

    assert!(users().all().await.unwrap().is_empty());
    // The widened read must not be served from the default-visibility
    // cache entry.
    assert_eq!(users().with_trashed().all().await.unwrap().len(), 1);
    assert_eq!(users().only_trashed().all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_layering_order_keeps_warm_results_hydrated() {
    let fixture = TestFixture::new();
    let user_id = fixture.create_user("ada").await;
    fixture.create_post(&user_id, "intro").await;
    fixture.create_post(&user_id, "follow-up").await;

    // Cold: fetches the user, caches it, attaches posts.
    let cold = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cold.get("posts").and_then(|p| p.as_array()).map(Vec::len), Some(2));

    let counts_after_cold = fixture.conn.op_counts();

    // Warm: the user row comes from cache, but the result is still
    // relation-hydrated because eager loading wraps the cache.
    let warm = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(warm.get("posts").and_then(|p| p.as_array()).map(Vec::len), Some(2));

    let counts_after_warm = fixture.conn.op_counts();
    // No new single-row fetch: the user came from cache.
    assert_eq!(counts_after_warm.find_one, counts_after_cold.find_one);
    // Relation hydration ran again on the warm path.
    assert_eq!(counts_after_warm.find, counts_after_cold.find + 1);
}

#[tokio::test]
async fn test_analytics_observe_hits_and_misses() {
    let fixture = TestFixture::new();
    let id = fixture.create_user("ada").await;

    let users = || fixture.orm.model("User").unwrap().cache(60);
    users().find(id.clone()).await.unwrap(); // miss
    users().find(id.clone()).await.unwrap(); // hit
    users().find(id.clone()).await.unwrap(); // hit

    let stats = fixture
        .orm
        .cache_stats()
        .into_iter()
        .find(|row| row.model == "User")
        .unwrap();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.ttl_secs, 60);
}

#[tokio::test]
async fn test_group_invalidation_is_narrower_than_model_invalidation() {
    let fixture = TestFixture::new();
    let id = fixture.create_user("ada").await;

    let users = || fixture.orm.model("User").unwrap().cache(60);
    users().find(id.clone()).await.unwrap();
    users().all().await.unwrap();

    fixture
        .orm
        .model("User")
        .unwrap()
        .invalidate_cache_group("find")
        .await;

    let reads = fixture.conn.op_counts().reads();
    users().find(id.clone()).await.unwrap(); // find group was dropped
    users().all().await.unwrap(); // all group still cached
    assert_eq!(fixture.conn.op_counts().reads(), reads + 1);
}

#[tokio::test]
async fn test_cached_empty_list_is_still_a_hit() {
    let fixture = TestFixture::new();
    fixture.orm.register(
        ModelDef::builder("Tag", "tags")
            .connection("memory")
            .default_cache_ttl(120)
            .build(),
    );

    assert!(fixture.orm.model("Tag").unwrap().all().await.unwrap().is_empty());
    let reads = fixture.conn.op_counts().reads();
    assert!(fixture.orm.model("Tag").unwrap().all().await.unwrap().is_empty());
    assert_eq!(fixture.conn.op_counts().reads(), reads);
}

#[tokio::test]
async fn test_eager_relations_do_not_split_the_cache_key() {
    let fixture = TestFixture::new();
    let user_id = fixture.create_user("ada").await;
    fixture.create_post(&user_id, "intro").await;

    // Warm the cache without eager loading.
    fixture
        .orm
        .model("User")
        .unwrap()
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap();

    // The eager-loaded call reuses the same cached row and only runs
    // the relation query.
    let counts = fixture.conn.op_counts();
    let hydrated = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fixture.conn.op_counts().find_one, counts.find_one);
    assert_eq!(hydrated.get("posts").and_then(|p| p.as_array()).map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_relation_hydrated_records_cache_their_bare_row() {
    // Regression guard for the layering choice: the cache stores the
    // bare row, so a later uncached read never sees stale relation data.
    let fixture = TestFixture::new();
    let user_id = fixture.create_user("ada").await;
    fixture.create_post(&user_id, "intro").await;

    fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap();

    let plain = fixture
        .orm
        .model("User")
        .unwrap()
        .cache(60)
        .find(user_id.clone())
        .await
        .unwrap()
        .unwrap();
    assert!(plain.get("posts").is_none());
}

#[tokio::test]
async fn test_group_ttl_table_implies_caching_for_every_group() {
    // A per-group TTL table counts as a model-level default: it turns
    // caching on for all reads, and groups without an entry fall back
    // to the global default TTL.
    let fixture = TestFixture::new();
    fixture.orm.register(
        ModelDef::builder("Note", "notes")
            .connection("memory")
            .group_cache_ttl("all", 300)
            .build(),
    );
    fixture
        .orm
        .model("Note")
        .unwrap()
        .create(rec(json!({"body": "hello"})))
        .await
        .unwrap();

    fixture.orm.model("Note").unwrap().all().await.unwrap();
    fixture.orm.model("Note").unwrap().find(1).await.unwrap();
    let reads = fixture.conn.op_counts().reads();
    fixture.orm.model("Note").unwrap().all().await.unwrap();
    fixture.orm.model("Note").unwrap().find(1).await.unwrap();
    assert_eq!(fixture.conn.op_counts().reads(), reads);
}
