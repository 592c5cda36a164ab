// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tests for relation descriptors and eager-load batching: grouping
//! correctness, single-batched-query call counts, nested paths,
//! polymorphic variants, and pivot maintenance.

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::{json, Value};

use testutils::TestFixture;

#[tokio::test]
async fn test_has_many_batches_into_one_query() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    let _u3 = fixture.create_user("edsger").await;
    fixture.create_post(&u1, "a1").await;
    fixture.create_post(&u1, "a2").await;
    fixture.create_post(&u2, "g1").await;

    let finds_before = fixture.conn.op_counts().find;
    let users = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .all()
        .await
        .unwrap();
    // One query for the users, one batched query for all their posts.
    assert_eq!(fixture.conn.op_counts().find, finds_before + 2);

    let posts_of = |record: &relica::Record| -> Vec<Value> {
        record
            .get("posts")
            .and_then(|p| p.as_array())
            .cloned()
            .expect("posts is always an array")
    };

    assert_eq!(users.len(), 3);
    assert_eq!(posts_of(&users[0]).len(), 2);
    assert_eq!(posts_of(&users[1]).len(), 1);
    // No matches means an empty array, never null.
    assert_eq!(posts_of(&users[2]).len(), 0);

    // Every attached post belongs to its parent.
    for user in &users {
        let uid = user.get("id").unwrap();
        for post in posts_of(user) {
            assert_eq!(post.get("user_id").unwrap(), uid);
        }
    }
}

#[tokio::test]
async fn test_has_one_attaches_first_match_or_null() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    fixture.create_profile(&u1, "pioneer").await;

    let users = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["profile"])
        .all()
        .await
        .unwrap();

    assert_eq!(
        users[0].get("profile").and_then(|p| p.get("bio")),
        Some(&json!("pioneer"))
    );
    assert_eq!(users[1].get("profile"), Some(&Value::Null));
    let _ = u2;
}

#[tokio::test]
async fn test_belongs_to_batches_and_attaches_owners() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    fixture.create_post(&u1, "a1").await;
    fixture.create_post(&u2, "g1").await;
    fixture
        .orm
        .model("Post")
        .unwrap()
        .create(testutils::rec(json!({"title": "orphan"})))
        .await
        .unwrap();

    let finds_before = fixture.conn.op_counts().find;
    let posts = fixture
        .orm
        .model("Post")
        .unwrap()
        .with(["author"])
        .all()
        .await
        .unwrap();
    assert_eq!(fixture.conn.op_counts().find, finds_before + 2);

    assert_eq!(
        posts[0].get("author").and_then(|a| a.get("name")),
        Some(&json!("ada"))
    );
    assert_eq!(
        posts[1].get("author").and_then(|a| a.get("name")),
        Some(&json!("grace"))
    );
    assert_eq!(posts[2].get("author"), Some(&Value::Null));
}

#[tokio::test]
async fn test_nested_eager_loading() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let p1 = fixture.create_post(&u1, "a1").await;
    let p2 = fixture.create_post(&u1, "a2").await;
    fixture.create_comment(&p1, "nice").await;
    fixture.create_comment(&p1, "agreed").await;
    fixture.create_comment(&p2, "hm").await;

    let finds_before = fixture.conn.op_counts().find;
    let users = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts.comments"])
        .all()
        .await
        .unwrap();
    // users + posts + comments: one batched query per level.
    assert_eq!(fixture.conn.op_counts().find, finds_before + 3);

    let posts = users[0].get("posts").and_then(|p| p.as_array()).unwrap();
    assert_eq!(posts.len(), 2);
    let comments_of = |post: &Value| post.get("comments").and_then(|c| c.as_array()).unwrap().len();
    assert_eq!(comments_of(&posts[0]) + comments_of(&posts[1]), 3);
}

#[tokio::test]
async fn test_belongs_to_many_through_pivot() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    let admin = fixture.create_role("admin").await;
    let editor = fixture.create_role("editor").await;

    let users = fixture.orm.model("User").unwrap();
    users
        .attach("roles", u1.clone(), &[admin.clone(), editor.clone()])
        .await
        .unwrap();
    users.attach("roles", u2.clone(), &[editor.clone()]).await.unwrap();

    let finds_before = fixture.conn.op_counts().find;
    let loaded = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["roles"])
        .all()
        .await
        .unwrap();
    // users + pivot rows + related rows: still O(1) queries, not O(N).
    assert_eq!(fixture.conn.op_counts().find, finds_before + 3);

    let role_names = |record: &relica::Record| -> Vec<String> {
        record
            .get("roles")
            .and_then(|r| r.as_array())
            .unwrap()
            .iter()
            .map(|role| role.get("name").unwrap().as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(role_names(&loaded[0]), vec!["admin", "editor"]);
    assert_eq!(role_names(&loaded[1]), vec!["editor"]);

    // detach removes every link for the parent.
    users.detach("roles", u1.clone()).await.unwrap();
    let loaded = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["roles"])
        .all()
        .await
        .unwrap();
    assert!(role_names(&loaded[0]).is_empty());
    assert_eq!(role_names(&loaded[1]), vec!["editor"]);

    // sync replaces the link set wholesale.
    users.sync("roles", u2.clone(), &[admin.clone()]).await.unwrap();
    let loaded = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["roles"])
        .all()
        .await
        .unwrap();
    assert_eq!(role_names(&loaded[1]), vec!["admin"]);
}

#[tokio::test]
async fn test_morph_one_filters_by_discriminator() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let p1 = fixture.create_post(&u1, "a1").await;
    // Same numeric target id, different types: the discriminator keeps
    // them apart.
    fixture.create_image("user", &u1, "user-avatar.png").await;
    fixture.create_image("post", &p1, "post-cover.png").await;

    let user = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["image"])
        .find(u1.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        user.get("image").and_then(|i| i.get("url")),
        Some(&json!("user-avatar.png"))
    );

    let post = fixture
        .orm
        .model("Post")
        .unwrap()
        .with(["image"])
        .find(p1.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        post.get("image").and_then(|i| i.get("url")),
        Some(&json!("post-cover.png"))
    );
}

#[tokio::test]
async fn test_morph_to_runs_one_query_per_distinct_type() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    let p1 = fixture.create_post(&u1, "a1").await;
    fixture.create_image("user", &u1, "i1").await;
    fixture.create_image("user", &u2, "i2").await;
    fixture.create_image("post", &p1, "i3").await;

    let finds_before = fixture.conn.op_counts().find;
    let images = fixture
        .orm
        .model("Image")
        .unwrap()
        .with(["imageable"])
        .all()
        .await
        .unwrap();
    // images + one batched query per distinct target type.
    assert_eq!(fixture.conn.op_counts().find, finds_before + 3);

    assert_eq!(
        images[0].get("imageable").and_then(|t| t.get("name")),
        Some(&json!("ada"))
    );
    assert_eq!(
        images[1].get("imageable").and_then(|t| t.get("name")),
        Some(&json!("grace"))
    );
    assert_eq!(
        images[2].get("imageable").and_then(|t| t.get("title")),
        Some(&json!("a1"))
    );
}

#[tokio::test]
async fn test_lazy_get_results_and_load() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    fixture.create_post(&u1, "a1").await;

    let users = fixture.orm.model("User").unwrap();
    let mut record = users.find(u1.clone()).await.unwrap().unwrap();
    assert!(record.get("posts").is_none());

    // Descriptor-level lazy fetch.
    let relation = users.relation("posts").unwrap();
    let results = relation.get_results(&record).await.unwrap();
    assert_eq!(results.as_array().map(Vec::len), Some(1));

    // Record-level load attaches under the relation name.
    users.load(&mut record, &["posts", "profile"]).await.unwrap();
    assert_eq!(record.get("posts").and_then(|p| p.as_array()).map(Vec::len), Some(1));
    assert_eq!(record.get("profile"), Some(&Value::Null));
}

#[tokio::test]
async fn test_undefined_relation_is_a_fatal_error() {
    let fixture = TestFixture::new();
    fixture.create_user("ada").await;

    let err = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["followers"])
        .all()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("followers"));

    let users = fixture.orm.model("User").unwrap();
    assert!(users.relation("followers").is_err());
}

#[tokio::test]
async fn test_eager_loading_composes_with_soft_deletes() {
    let fixture = TestFixture::new();
    let u1 = fixture.create_user("ada").await;
    let u2 = fixture.create_user("grace").await;
    fixture.create_post(&u1, "a1").await;
    fixture.create_post(&u2, "g1").await;

    fixture.orm.model("User").unwrap().delete(u2.clone()).await.unwrap();

    let users = fixture
        .orm
        .model("User")
        .unwrap()
        .with(["posts"])
        .all()
        .await
        .unwrap();
    // The deleted user is filtered before hydration.
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].get("id"), Some(&u1));
    assert_eq!(
        users[0].get("posts").and_then(|p| p.as_array()).map(Vec::len),
        Some(1)
    );
}
