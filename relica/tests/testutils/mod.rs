// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fixture for integration tests
//!
//! Builds an ORM over the in-memory document connection with a small
//! blog-shaped schema: users with posts, profiles, roles through a
//! pivot, and polymorphic images. The connection's operation counters
//! let tests assert call-count contracts.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use relica::{
    CastType, ConnectionHandle, MemoryConnection, ModelDef, Orm, Record, RelationDef,
};

pub struct TestFixture {
    pub orm: Orm,
    pub conn: Arc<MemoryConnection>,
}

/// Shorthand: build a record from a JSON object literal.
pub fn rec(value: Value) -> Record {
    value.as_object().cloned().expect("record literals are objects")
}

impl TestFixture {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let conn = Arc::new(MemoryConnection::new());
        let orm = Orm::builder()
            .connection("memory", ConnectionHandle::Document(conn.clone()))
            .build();

        orm.register(
            ModelDef::builder("User", "users")
                .soft_deletes()
                .hidden(["password"])
                .cast("age", CastType::Number)
                .relation("posts", RelationDef::has_many("Post", "user_id", "id"))
                .relation("profile", RelationDef::has_one("Profile", "user_id", "id"))
                .relation(
                    "roles",
                    RelationDef::belongs_to_many("Role", "role_user", "user_id", "role_id"),
                )
                .relation(
                    "image",
                    RelationDef::morph_one("Image", "imageable_type", "imageable_id", "user"),
                )
                .build(),
        );
        orm.register(
            ModelDef::builder("Post", "posts")
                .relation("author", RelationDef::belongs_to("User", "user_id", "id"))
                .relation("comments", RelationDef::has_many("Comment", "post_id", "id"))
                .relation(
                    "image",
                    RelationDef::morph_one("Image", "imageable_type", "imageable_id", "post"),
                )
                .build(),
        );
        orm.register(ModelDef::builder("Profile", "profiles").build());
        orm.register(ModelDef::builder("Comment", "comments").build());
        orm.register(ModelDef::builder("Role", "roles").build());
        orm.register(
            ModelDef::builder("Image", "images")
                .relation("imageable", RelationDef::morph_to("imageable_type", "imageable_id"))
                .build(),
        );
        orm.register_morph("user", "User");
        orm.register_morph("post", "Post");

        Self { orm, conn }
    }

    pub async fn create_user(&self, name: &str) -> Value {
        let record = self
            .orm
            .model("User")
            .unwrap()
            .create(rec(json!({"name": name})))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }

    pub async fn create_post(&self, user_id: &Value, title: &str) -> Value {
        let record = self
            .orm
            .model("Post")
            .unwrap()
            .create(rec(json!({"user_id": user_id, "title": title})))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }

    pub async fn create_comment(&self, post_id: &Value, body: &str) -> Value {
        let record = self
            .orm
            .model("Comment")
            .unwrap()
            .create(rec(json!({"post_id": post_id, "body": body})))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }

    pub async fn create_profile(&self, user_id: &Value, bio: &str) -> Value {
        let record = self
            .orm
            .model("Profile")
            .unwrap()
            .create(rec(json!({"user_id": user_id, "bio": bio})))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }

    pub async fn create_role(&self, name: &str) -> Value {
        let record = self
            .orm
            .model("Role")
            .unwrap()
            .create(rec(json!({"name": name})))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }

    pub async fn create_image(&self, kind: &str, target_id: &Value, url: &str) -> Value {
        let record = self
            .orm
            .model("Image")
            .unwrap()
            .create(rec(json!({
                "imageable_type": kind,
                "imageable_id": target_id,
                "url": url,
            })))
            .await
            .unwrap();
        record.get("id").cloned().unwrap()
    }
}
