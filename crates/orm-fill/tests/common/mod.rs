//! Shared fixtures: a small blog schema on the in-memory backend

#![allow(dead_code)]

use elif_orm_fill::memory::{MemoryDatabase, MemoryModel, MemoryRecord, TableSchema};
use elif_orm_fill::{
    Attributes, FillAttributes, FillableModel, PivotConfig, Relation, RelationRegistry,
};
use once_cell::sync::Lazy;
use serde_json::Value;

pub fn attrs(value: Value) -> Attributes {
    serde_json::from_value(value).expect("attributes must be a JSON object")
}

pub fn input(value: Value) -> FillAttributes {
    FillAttributes::from_json(value).expect("input must be a JSON object")
}

pub fn database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.define_table(TableSchema::new("users").with_morph_class("user"));
    db.define_table(TableSchema::new("teams"));
    db.define_table(TableSchema::new("profiles"));
    db.define_table(TableSchema::new("posts").with_morph_class("post").with_timestamps());
    db.define_table(TableSchema::new("roles"));
    db.define_table(TableSchema::new("images"));
    db.define_table(TableSchema::new("comments").with_uuid_keys());
    db
}

/// Users own most relation kinds
#[derive(Debug, Clone)]
pub struct User {
    record: MemoryRecord,
}

impl User {
    pub fn new(db: &MemoryDatabase) -> Self {
        Self {
            record: db.make("users", Attributes::new()).expect("users table"),
        }
    }

    pub fn load(db: &MemoryDatabase, id: i64) -> Self {
        Self {
            record: db
                .find("users", &Value::from(id))
                .expect("users table")
                .expect("user exists"),
        }
    }
}

impl MemoryModel for User {
    fn record(&self) -> &MemoryRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut MemoryRecord {
        &mut self.record
    }
}

fn team(user: &User) -> Relation {
    user.record.belongs_to("team", "teams", "team_id")
}

fn profile(user: &User) -> Relation {
    user.record.has_one("profile", "profiles", "user_id")
}

fn posts(user: &User) -> Relation {
    user.record.has_many("posts", "posts", "user_id")
}

fn roles(user: &User) -> Relation {
    user.record.belongs_to_many(
        "roles",
        "roles",
        PivotConfig::new("role_user".to_string(), "user_id".to_string(), "role_id".to_string()),
    )
}

fn avatar(user: &User) -> Relation {
    user.record.morph_one("avatar", "images", "imageable")
}

fn comments(user: &User) -> Relation {
    user.record.morph_many("comments", "comments", "commentable")
}

fn post_comments(user: &User) -> Relation {
    user.record.has_many_through("post_comments", "comments", "post_id")
}

static USER_RELATIONS: Lazy<RelationRegistry<User>> = Lazy::new(|| {
    RelationRegistry::new()
        .register("team", team)
        .register("profile", profile)
        .register("posts", posts)
        .register("roles", roles)
        .register("avatar", avatar)
        .register("comments", comments)
        .register("post_comments", post_comments)
});

impl FillableModel for User {
    fn fillable_relations() -> &'static [&'static str] {
        &[
            "team",
            "profile",
            "posts",
            "roles",
            "avatar",
            "comments",
            "post_comments",
            "unregistered",
        ]
    }

    fn relations() -> &'static RelationRegistry<User> {
        &USER_RELATIONS
    }

    fn new_instance(&self) -> Self {
        Self::new(self.record.database())
    }
}

/// Comments point at either a post or a user
#[derive(Debug, Clone)]
pub struct Comment {
    record: MemoryRecord,
}

impl Comment {
    pub fn new(db: &MemoryDatabase) -> Self {
        Self {
            record: db.make("comments", Attributes::new()).expect("comments table"),
        }
    }
}

impl MemoryModel for Comment {
    fn record(&self) -> &MemoryRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut MemoryRecord {
        &mut self.record
    }
}

fn commentable(comment: &Comment) -> Relation {
    comment.record.morph_to("commentable", &["post", "user"])
}

static COMMENT_RELATIONS: Lazy<RelationRegistry<Comment>> =
    Lazy::new(|| RelationRegistry::new().register("commentable", commentable));

impl FillableModel for Comment {
    fn fillable_relations() -> &'static [&'static str] {
        &["commentable"]
    }

    fn relations() -> &'static RelationRegistry<Comment> {
        &COMMENT_RELATIONS
    }

    fn new_instance(&self) -> Self {
        Self::new(self.record.database())
    }
}
