//! End-to-end nested fills against the in-memory backend

mod common;

use common::{attrs, database, input, Comment, User};
use elif_orm_fill::memory::Operation;
use elif_orm_fill::{
    FillConfig, FillError, FillRecord, FillValue, FillsRelations, MissingRelatedPolicy,
    ModelError, RelationFiller, RelationshipType,
};
use serde_json::{json, Value};

fn seeded_user(db: &elif_orm_fill::memory::MemoryDatabase) -> User {
    db.create("users", attrs(json!({"name": "Ann"}))).unwrap();
    User::load(db, 1)
}

#[tokio::test]
async fn test_belongs_to_creates_related_without_saving_owner() {
    let db = database();
    let mut user = User::new(&db);

    RelationFiller::default()
        .fill(&mut user, input(json!({"name": "Ann", "team": {"name": "Core"}})))
        .await
        .unwrap();

    assert_eq!(db.count("teams"), 1);
    assert_eq!(user.get_attribute("team_id"), Some(json!(1)));
    assert_eq!(user.get_attribute("name"), Some(json!("Ann")));
    assert!(!user.exists());
    assert_eq!(db.count("users"), 0);
}

#[tokio::test]
async fn test_belongs_to_with_key_updates_existing() {
    let db = database();
    db.create("teams", attrs(json!({"name": "Old"}))).unwrap();
    let mut user = User::new(&db);

    RelationFiller::default()
        .fill(&mut user, input(json!({"team": {"id": 1, "name": "New"}})))
        .await
        .unwrap();

    let team = db.find("teams", &json!(1)).unwrap().unwrap();
    assert_eq!(team.get("name"), Some(&json!("New")));
    assert_eq!(db.count("teams"), 1);
    assert_eq!(user.get_attribute("team_id"), Some(json!(1)));
}

#[tokio::test]
async fn test_belongs_to_with_unknown_key_fails() {
    let db = database();
    let mut user = User::new(&db);

    let err = RelationFiller::default()
        .fill(&mut user, input(json!({"team": {"id": 99, "name": "Ghost"}})))
        .await
        .unwrap_err();

    match err {
        FillError::RelatedRecordNotFound { relation, criteria } => {
            assert_eq!(relation, "team");
            assert_eq!(criteria, "id = 99");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.count("teams"), 0);
}

#[tokio::test]
async fn test_missing_related_policy_create() {
    let db = database();
    let mut user = User::new(&db);
    let config = FillConfig::default().with_missing_related(MissingRelatedPolicy::Create);
    let filler = RelationFiller::new(config);

    filler
        .fill(&mut user, input(json!({"team": {"id": 42, "name": "Fresh"}})))
        .await
        .unwrap();

    let team = db.find("teams", &json!(42)).unwrap().unwrap();
    assert_eq!(team.get("name"), Some(&json!("Fresh")));
    assert_eq!(user.get_attribute("team_id"), Some(json!(42)));
}

#[tokio::test]
async fn test_has_many_without_keys_replaces_collection() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("posts", attrs(json!({"title": "one", "user_id": 1}))).unwrap();
    db.create("posts", attrs(json!({"title": "two", "user_id": 1}))).unwrap();
    db.create("posts", attrs(json!({"title": "other", "user_id": 2}))).unwrap();

    RelationFiller::default()
        .fill(&mut user, input(json!({"posts": [{"title": "fresh"}]})))
        .await
        .unwrap();

    let mine = db.where_eq("posts", &attrs(json!({"user_id": 1}))).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].get("title"), Some(&json!("fresh")));
    assert_eq!(db.where_eq("posts", &attrs(json!({"user_id": 2}))).unwrap().len(), 1);
}

#[tokio::test]
async fn test_has_many_with_keys_updates_selectively() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("posts", attrs(json!({"title": "one", "user_id": 1}))).unwrap();
    db.create("posts", attrs(json!({"title": "two", "user_id": 1}))).unwrap();
    db.clear_journal();

    RelationFiller::default()
        .fill(
            &mut user,
            input(json!({"posts": [{"id": 1, "title": "uno"}, {"title": "three"}]})),
        )
        .await
        .unwrap();

    let mine = db.where_eq("posts", &attrs(json!({"user_id": 1}))).unwrap();
    assert_eq!(mine.len(), 3);
    assert_eq!(db.find("posts", &json!(1)).unwrap().unwrap().get("title"), Some(&json!("uno")));
    assert_eq!(db.find("posts", &json!(2)).unwrap().unwrap().get("title"), Some(&json!("two")));
    assert!(!db
        .journal()
        .iter()
        .any(|op| matches!(op, Operation::Delete { .. })));
}

#[tokio::test]
async fn test_has_many_saves_new_owner_first() {
    let db = database();
    let mut user = User::new(&db);

    RelationFiller::default()
        .fill(&mut user, input(json!({"name": "Ann", "posts": [{"title": "A"}]})))
        .await
        .unwrap();

    assert!(user.exists());
    assert_eq!(
        db.journal().first(),
        Some(&Operation::Insert {
            table: "users".to_string(),
            key: json!(1),
        })
    );
    let post = db.find("posts", &json!(1)).unwrap().unwrap();
    assert_eq!(post.get("user_id"), Some(&json!(1)));
    assert!(post.get("created_at").is_some());
}

#[tokio::test]
async fn test_has_many_accepts_records() {
    let db = database();
    let mut user = seeded_user(&db);
    let draft = db.make("posts", attrs(json!({"title": "draft"}))).unwrap();

    let attributes = input(json!({})).with("posts", vec![FillValue::record(draft)]);
    RelationFiller::default().fill(&mut user, attributes).await.unwrap();

    let post = db.find("posts", &json!(1)).unwrap().unwrap();
    assert_eq!(post.get("title"), Some(&json!("draft")));
    assert_eq!(post.get("user_id"), Some(&json!(1)));
}

#[tokio::test]
async fn test_belongs_to_many_replaces_links() {
    let db = database();
    let mut user = seeded_user(&db);
    for name in ["admin", "editor", "viewer"] {
        db.create("roles", attrs(json!({ "name": name }))).unwrap();
    }
    let filler = RelationFiller::default();

    filler
        .fill(&mut user, input(json!({"roles": [{"name": "admin"}]})))
        .await
        .unwrap();
    assert_eq!(db.pivot_rows("role_user").len(), 1);

    filler
        .fill(
            &mut user,
            input(json!({"roles": [
                {"name": "editor", "pivot": {"expires": "2030-01-01"}},
                {"id": 3}
            ]})),
        )
        .await
        .unwrap();

    let mut links = db.pivot_rows("role_user");
    links.sort_by_key(|row| row.get("role_id").and_then(Value::as_i64));
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].get("role_id"), Some(&json!(2)));
    assert_eq!(links[0].get("expires"), Some(&json!("2030-01-01")));
    assert_eq!(links[1].get("role_id"), Some(&json!(3)));
    assert!(links.iter().all(|row| row.get("user_id") == Some(&json!(1))));
}

#[tokio::test]
async fn test_belongs_to_many_unknown_element_fails_after_detach() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("roles", attrs(json!({"name": "admin"}))).unwrap();
    let filler = RelationFiller::default();
    filler
        .fill(&mut user, input(json!({"roles": [{"name": "admin"}]})))
        .await
        .unwrap();

    let err = filler
        .fill(&mut user, input(json!({"roles": [{"name": "ghost"}]})))
        .await
        .unwrap_err();

    match err {
        FillError::RelatedRecordNotFound { relation, criteria } => {
            assert_eq!(relation, "roles");
            assert_eq!(criteria, "name = \"ghost\"");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(db.pivot_rows("role_user").is_empty());
}

#[tokio::test]
async fn test_belongs_to_many_custom_pivot_key() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("roles", attrs(json!({"name": "admin"}))).unwrap();

    RelationFiller::new(FillConfig::default().with_pivot_key("meta"))
        .fill(
            &mut user,
            input(json!({"roles": [{"name": "admin", "meta": {"granted_by": 7}}]})),
        )
        .await
        .unwrap();

    let links = db.pivot_rows("role_user");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].get("granted_by"), Some(&json!(7)));
}

#[tokio::test]
async fn test_create_with_has_one_then_update() {
    let db = database();
    let prototype = User::new(&db);
    let filler = RelationFiller::default();

    let mut user = filler
        .create(&prototype, input(json!({"name": "Ann", "profile": {"bio": "hi"}})))
        .await
        .unwrap();

    assert!(user.exists());
    assert_eq!(user.key(), Some(json!(1)));
    let profile = db.find("profiles", &json!(1)).unwrap().unwrap();
    assert_eq!(profile.get("user_id"), Some(&json!(1)));
    assert_eq!(profile.get("bio"), Some(&json!("hi")));

    filler
        .fill(&mut user, input(json!({"profile": {"bio": "bye"}})))
        .await
        .unwrap();

    assert_eq!(db.count("profiles"), 1);
    let profile = db.find("profiles", &json!(1)).unwrap().unwrap();
    assert_eq!(profile.get("bio"), Some(&json!("bye")));
}

#[tokio::test]
async fn test_unsupported_kind_keeps_earlier_relations() {
    let db = database();
    let mut user = seeded_user(&db);

    let err = RelationFiller::default()
        .fill(
            &mut user,
            input(json!({
                "posts": [{"title": "kept"}],
                "post_comments": [{"body": "nope"}]
            })),
        )
        .await
        .unwrap_err();

    match err {
        FillError::UnsupportedRelationKind { relation, kind } => {
            assert_eq!(relation, "post_comments");
            assert_eq!(kind, RelationshipType::HasManyThrough);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.count("posts"), 1);
    assert_eq!(db.count("comments"), 0);
}

#[tokio::test]
async fn test_fillable_relation_without_accessor() {
    let db = database();
    let mut user = seeded_user(&db);

    let err = RelationFiller::default()
        .fill(&mut user, input(json!({"unregistered": {"a": 1}})))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FillError::MissingAccessor { ref relation } if relation == "unregistered"
    ));
}

#[tokio::test]
async fn test_non_fillable_keys_are_scalars() {
    let db = database();
    let mut user = seeded_user(&db);

    RelationFiller::default()
        .fill(&mut user, input(json!({"settings": {"theme": "dark"}})))
        .await
        .unwrap();

    assert_eq!(user.get_attribute("settings"), Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn test_malformed_payloads_are_rejected() {
    let db = database();
    let mut user = seeded_user(&db);
    let filler = RelationFiller::default();

    let err = filler
        .fill(&mut user, input(json!({"posts": "nope"})))
        .await
        .unwrap_err();
    assert!(matches!(err, FillError::InvalidPayload { ref relation, .. } if relation == "posts"));

    let err = filler
        .fill(&mut user, input(json!({"team": [1, 2]})))
        .await
        .unwrap_err();
    assert!(matches!(err, FillError::InvalidPayload { ref relation, .. } if relation == "team"));
}

#[tokio::test]
async fn test_morph_one_stamps_morph_class() {
    let db = database();
    let mut user = seeded_user(&db);
    let filler = RelationFiller::default();

    filler
        .fill(&mut user, input(json!({"avatar": {"url": "a.png"}})))
        .await
        .unwrap();
    filler
        .fill(&mut user, input(json!({"avatar": {"url": "b.png"}})))
        .await
        .unwrap();

    assert_eq!(db.count("images"), 1);
    let image = db.find("images", &json!(1)).unwrap().unwrap();
    assert_eq!(image.get("url"), Some(&json!("b.png")));
    assert_eq!(image.get("imageable_id"), Some(&json!(1)));
    assert_eq!(image.get("imageable_type"), Some(&json!("user")));
}

#[tokio::test]
async fn test_morph_many_replaces_collection() {
    let db = database();
    let mut user = seeded_user(&db);
    let filler = RelationFiller::default();

    filler
        .fill(&mut user, input(json!({"comments": [{"body": "a"}, {"body": "b"}]})))
        .await
        .unwrap();
    filler
        .fill(&mut user, input(json!({"comments": [{"body": "c"}]})))
        .await
        .unwrap();

    let comments = db
        .where_eq("comments", &attrs(json!({"commentable_type": "user", "commentable_id": 1})))
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].get("body"), Some(&json!("c")));
    assert!(comments[0].key().map(|key| key.is_string()).unwrap_or(false));
}

#[tokio::test]
async fn test_morph_to_creates_default_type() {
    let db = database();
    let mut comment = Comment::new(&db);

    RelationFiller::default()
        .fill(&mut comment, input(json!({"body": "x", "commentable": {"title": "Hello"}})))
        .await
        .unwrap();

    assert_eq!(db.count("posts"), 1);
    assert_eq!(comment.get_attribute("commentable_type"), Some(json!("post")));
    assert_eq!(comment.get_attribute("commentable_id"), Some(json!(1)));
    assert_eq!(db.count("comments"), 0);
}

#[tokio::test]
async fn test_morph_to_updates_current_target() {
    let db = database();
    db.create("posts", attrs(json!({"title": "old"}))).unwrap();
    let mut comment = Comment::new(&db);
    comment.set_attribute("commentable_type", json!("post"));
    comment.set_attribute("commentable_id", json!(1));

    RelationFiller::default()
        .fill(&mut comment, input(json!({"commentable": {"title": "new"}})))
        .await
        .unwrap();

    assert_eq!(db.count("posts"), 1);
    let post = db.find("posts", &json!(1)).unwrap().unwrap();
    assert_eq!(post.get("title"), Some(&json!("new")));
}

#[tokio::test]
async fn test_morph_to_accepts_record() {
    let db = database();
    let author = db.create("users", attrs(json!({"name": "Ann"}))).unwrap();
    let mut comment = Comment::new(&db);

    let attributes = input(json!({})).with("commentable", FillValue::record(author));
    RelationFiller::default().fill(&mut comment, attributes).await.unwrap();

    assert_eq!(comment.get_attribute("commentable_type"), Some(json!("user")));
    assert_eq!(comment.get_attribute("commentable_id"), Some(json!(1)));
}

#[tokio::test]
async fn test_morph_to_rejects_disallowed_type() {
    let db = database();
    let image = db.create("images", attrs(json!({"url": "a.png"}))).unwrap();
    let mut comment = Comment::new(&db);
    db.clear_journal();

    let attributes = input(json!({})).with("commentable", FillValue::record(image));
    let err = RelationFiller::default()
        .fill(&mut comment, attributes)
        .await
        .unwrap_err();

    match err {
        FillError::Relation { relation, source } => {
            assert_eq!(relation, "commentable");
            assert!(matches!(source, ModelError::Relationship(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(comment.get_attribute("commentable_type").is_none());
    assert!(db.journal().is_empty());
}

#[tokio::test]
async fn test_fills_relations_extension() {
    let db = database();
    let prototype = User::new(&db);

    let mut user = prototype
        .create_with_relations(input(json!({"name": "Ann", "posts": [{"title": "A"}]})))
        .await
        .unwrap();
    user.fill_with_relations(input(json!({"posts": [{"title": "B"}]})))
        .await
        .unwrap();

    let posts = db.where_eq("posts", &attrs(json!({"user_id": 1}))).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].get("title"), Some(&json!("B")));
}

#[tokio::test]
async fn test_numeric_string_key_does_not_collide_with_sequence() {
    let db = database();
    let config = FillConfig::default().with_missing_related(MissingRelatedPolicy::Create);
    let filler = RelationFiller::new(config);

    let mut first = User::new(&db);
    filler
        .fill(&mut first, input(json!({"team": {"id": "1", "name": "FromForm"}})))
        .await
        .unwrap();
    let mut second = User::new(&db);
    filler
        .fill(&mut second, input(json!({"team": {"name": "Auto"}})))
        .await
        .unwrap();

    assert_eq!(db.count("teams"), 2);
    assert_eq!(db.where_eq("teams", &attrs(json!({"id": 1}))).unwrap().len(), 1);
    assert_eq!(second.get_attribute("team_id"), Some(json!(2)));
}

#[tokio::test]
async fn test_has_many_malformed_element_writes_nothing() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("posts", attrs(json!({"title": "one", "user_id": 1}))).unwrap();
    db.create("posts", attrs(json!({"title": "two", "user_id": 1}))).unwrap();
    db.clear_journal();

    let err = RelationFiller::default()
        .fill(&mut user, input(json!({"posts": [{"title": "a"}, 5]})))
        .await
        .unwrap_err();

    assert!(matches!(err, FillError::InvalidPayload { ref relation, .. } if relation == "posts"));
    assert_eq!(db.count("posts"), 2);
    assert!(db.journal().is_empty());
}

#[tokio::test]
async fn test_malformed_element_does_not_save_new_owner() {
    let db = database();
    let mut user = User::new(&db);

    let err = RelationFiller::default()
        .fill(&mut user, input(json!({"name": "Ann", "comments": ["hi"]})))
        .await
        .unwrap_err();

    assert!(matches!(err, FillError::InvalidPayload { .. }));
    assert!(!user.exists());
    assert_eq!(db.count("users"), 0);
}

#[tokio::test]
async fn test_belongs_to_many_malformed_element_keeps_links() {
    let db = database();
    let mut user = seeded_user(&db);
    db.create("roles", attrs(json!({"name": "admin"}))).unwrap();
    let filler = RelationFiller::default();
    filler
        .fill(&mut user, input(json!({"roles": [{"name": "admin"}]})))
        .await
        .unwrap();

    let err = filler
        .fill(
            &mut user,
            input(json!({"roles": [{"name": "admin"}, {"pivot": {"note": "x"}}]})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FillError::InvalidPayload { ref relation, .. } if relation == "roles"));
    assert_eq!(db.pivot_rows("role_user").len(), 1);
}

#[tokio::test]
async fn test_belongs_to_many_attaches_key_with_pivot_columns() {
    let db = database();
    let mut user = seeded_user(&db);
    for name in ["admin", "editor", "viewer"] {
        db.create("roles", attrs(json!({ "name": name }))).unwrap();
    }
    let filler = RelationFiller::default();
    filler
        .fill(&mut user, input(json!({"roles": [{"id": 1}]})))
        .await
        .unwrap();
    db.clear_journal();

    filler
        .fill(&mut user, input(json!({"roles": [{"id": 3, "pivot": {"role": "admin"}}]})))
        .await
        .unwrap();

    let links = db.pivot_rows("role_user");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].get("role_id"), Some(&json!(3)));
    assert_eq!(links[0].get("role"), Some(&json!("admin")));
    let journal = db.journal();
    assert!(matches!(journal.first(), Some(Operation::Detach { .. })));
    assert!(matches!(journal.last(), Some(Operation::Attach { .. })));
}

#[tokio::test]
async fn test_has_one_and_morph_one_accept_records() {
    let db = database();
    let mut user = seeded_user(&db);
    let profile = db.make("profiles", attrs(json!({"bio": "built"}))).unwrap();
    let image = db.make("images", attrs(json!({"url": "built.png"}))).unwrap();

    let attributes = input(json!({}))
        .with("profile", FillValue::record(profile))
        .with("avatar", FillValue::record(image));
    RelationFiller::default().fill(&mut user, attributes).await.unwrap();

    let profile = db.find("profiles", &json!(1)).unwrap().unwrap();
    assert_eq!(profile.get("bio"), Some(&json!("built")));
    assert_eq!(profile.get("user_id"), Some(&json!(1)));
    let image = db.find("images", &json!(1)).unwrap().unwrap();
    assert_eq!(image.get("imageable_id"), Some(&json!(1)));
    assert_eq!(image.get("imageable_type"), Some(&json!("user")));
}

#[tokio::test]
async fn test_morph_many_with_keys_updates_selectively() {
    let db = database();
    let mut user = seeded_user(&db);
    let filler = RelationFiller::default();
    filler
        .fill(&mut user, input(json!({"comments": [{"body": "a"}, {"body": "b"}]})))
        .await
        .unwrap();
    let first = db
        .where_eq("comments", &attrs(json!({"body": "a"})))
        .unwrap()
        .remove(0);
    let key = first.key().unwrap();
    db.clear_journal();

    filler
        .fill(
            &mut user,
            input(json!({"comments": [{"id": key.clone(), "body": "edited"}, {"body": "c"}]})),
        )
        .await
        .unwrap();

    let comments = db
        .where_eq("comments", &attrs(json!({"commentable_type": "user", "commentable_id": 1})))
        .unwrap();
    assert_eq!(comments.len(), 3);
    let edited = db.find("comments", &key).unwrap().unwrap();
    assert_eq!(edited.get("body"), Some(&json!("edited")));
    assert!(!db
        .journal()
        .iter()
        .any(|op| matches!(op, Operation::Delete { .. })));
}

#[tokio::test]
async fn test_morph_to_with_key_updates_found_record() {
    let db = database();
    db.create("posts", attrs(json!({"title": "old"}))).unwrap();
    let mut comment = Comment::new(&db);

    RelationFiller::default()
        .fill(&mut comment, input(json!({"commentable": {"id": 1, "title": "updated"}})))
        .await
        .unwrap();

    assert_eq!(db.count("posts"), 1);
    let post = db.find("posts", &json!(1)).unwrap().unwrap();
    assert_eq!(post.get("title"), Some(&json!("updated")));
    assert_eq!(comment.get_attribute("commentable_type"), Some(json!("post")));
    assert_eq!(comment.get_attribute("commentable_id"), Some(json!(1)));
}

#[tokio::test]
async fn test_morph_to_with_unknown_key_follows_policy() {
    let db = database();
    let payload = json!({"commentable": {"id": 9, "title": "missing"}});

    let mut comment = Comment::new(&db);
    let err = RelationFiller::default()
        .fill(&mut comment, input(payload.clone()))
        .await
        .unwrap_err();
    match err {
        FillError::RelatedRecordNotFound { relation, criteria } => {
            assert_eq!(relation, "commentable");
            assert_eq!(criteria, "id = 9");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.count("posts"), 0);

    let config = FillConfig::default().with_missing_related(MissingRelatedPolicy::Create);
    RelationFiller::new(config)
        .fill(&mut comment, input(payload))
        .await
        .unwrap();
    let post = db.find("posts", &json!(9)).unwrap().unwrap();
    assert_eq!(post.get("title"), Some(&json!("missing")));
    assert_eq!(comment.get_attribute("commentable_id"), Some(json!(9)));
}
