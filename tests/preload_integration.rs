//! Integration tests for association preloading.
//!
//! These tests run preloads against an in-memory engine and verify:
//! - Relation inference (belongs-to, has-one, has-many, declared keys)
//! - Batching into a single query per path segment
//! - Fan-in onto owners sharing a reference
//! - Error reporting for bad paths, targets and schemas

mod common;

use common::*;
use grimoire::prelude::*;
use grimoire::RelationLoader;
use pretty_assertions::assert_eq;

fn in_filter(query: &Query) -> (&str, Vec<FilterValue>) {
    match &query.condition {
        Filter::In(column, values) => (column.as_str(), values.clone()),
        other => panic!("expected an IN filter, got {:?}", other),
    }
}

#[tokio::test]
async fn test_has_many_loads_in_one_query() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut users = vec![user(1, "ann"), user(2, "bob"), user(3, "cy")];

    repo.preload_all(&mut users, "posts").await.unwrap();

    let queries = engine.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].collection, "posts");
    assert_eq!(
        in_filter(&queries[0]),
        ("user_id", vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Int(3)])
    );

    let titles: Vec<Vec<&str>> = users
        .iter()
        .map(|u| u.posts.iter().map(|p| p.title.as_str()).collect())
        .collect();
    assert_eq!(titles, vec![vec!["first", "second"], vec!["hello"], vec![]]);
}

#[tokio::test]
async fn test_preload_is_idempotent() {
    let repo = Repo::new(blog_engine());
    let mut users = vec![user(1, "ann")];

    repo.preload_all(&mut users, "posts").await.unwrap();
    repo.preload_all(&mut users, "posts").await.unwrap();

    assert_eq!(users[0].posts.len(), 2);
}

#[tokio::test]
async fn test_belongs_to_dedupes_shared_references() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut posts = vec![post(10, 1, "first"), post(11, 1, "second"), post(12, 2, "hello")];

    repo.preload_all(&mut posts, "user").await.unwrap();

    let queries = engine.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].collection, "users");
    assert_eq!(
        in_filter(&queries[0]),
        ("id", vec![FilterValue::Int(1), FilterValue::Int(2)])
    );

    let names: Vec<_> = posts
        .iter()
        .map(|p| p.user.as_ref().map(|u| u.name.clone()))
        .collect();
    assert_eq!(
        names,
        vec![Some("ann".to_string()), Some("ann".to_string()), Some("bob".to_string())]
    );
}

#[tokio::test]
async fn test_null_reference_is_skipped() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut comments: Vec<Comment> = repo.all(repo.from("comments")).await.unwrap();

    repo.preload_all(&mut comments, "parent").await.unwrap();

    let queries = engine.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(in_filter(&queries[1]), ("id", vec![FilterValue::Int(100)]));

    assert!(comments[0].parent.is_none());
    assert_eq!(comments[1].parent.as_ref().map(|p| p.id), Some(100));
    assert!(comments[2].parent.is_none());
}

#[tokio::test]
async fn test_no_query_without_keys() {
    let engine = MemoryEngine::new()
        .with_rows("comments", vec![comment_row(1, 10, None, "root")]);
    let repo = Repo::new(engine.clone());
    let mut comments: Vec<Comment> = repo.all(repo.from("comments")).await.unwrap();

    repo.preload_all(&mut comments, "parent").await.unwrap();

    assert_eq!(engine.queries().len(), 1);
    assert!(comments[0].parent.is_none());
}

#[tokio::test]
async fn test_has_one() {
    let repo = Repo::new(blog_engine());
    let mut users = vec![user(1, "ann"), user(2, "bob")];

    repo.preload_all(&mut users, "profile").await.unwrap();

    assert!(users[0].profile.is_none());
    assert_eq!(
        users[1].profile.as_ref().map(|p| p.bio.as_str()),
        Some("bob's bio")
    );
}

#[tokio::test]
async fn test_nested_path_issues_one_query_per_segment() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut users = vec![user(1, "ann"), user(2, "bob")];

    repo.preload_all(&mut users, "posts").await.unwrap();
    repo.preload_all(&mut users, "posts.comments").await.unwrap();

    let queries = engine.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].collection, "comments");
    assert_eq!(
        in_filter(&queries[1]),
        (
            "post_id",
            vec![FilterValue::Int(10), FilterValue::Int(11), FilterValue::Int(12)]
        )
    );

    let bodies: Vec<&str> = users[0].posts[0]
        .comments
        .iter()
        .map(|c| c.body.as_str())
        .collect();
    assert_eq!(bodies, vec!["nice", "agreed"]);
    assert!(users[0].posts[1].comments.is_empty());
    assert_eq!(users[1].posts[0].comments.len(), 1);
}

#[tokio::test]
async fn test_single_record_preload() {
    let repo = Repo::new(blog_engine());
    let mut ann = user(1, "ann");

    repo.preload(&mut ann, "posts").await.unwrap();

    assert_eq!(ann.posts.len(), 2);
    assert!(ann.posts.iter().all(|p| p.user_id == 1));
}

#[tokio::test]
async fn test_declared_keys_override_inference() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut articles = vec![Article {
        id: 1,
        writer_uid: 2,
        title: "on rust".into(),
        writer: User::default(),
    }];

    repo.preload_all(&mut articles, "writer").await.unwrap();

    let queries = engine.queries();
    assert_eq!(in_filter(&queries[0]), ("id", vec![FilterValue::Int(2)]));
    assert_eq!(articles[0].writer.name, "bob");
}

#[tokio::test]
async fn test_unknown_relation_is_invalid_path() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut users = vec![user(1, "ann")];

    let err = repo.preload_all(&mut users, "pets").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPath);

    let err = repo.preload_all(&mut users, "posts..comments").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPath);

    assert!(engine.queries().is_empty());
}

#[tokio::test]
async fn test_unknown_nested_segment_is_invalid_path() {
    let repo = Repo::new(blog_engine());
    let mut users = vec![user(1, "ann")];
    repo.preload_all(&mut users, "posts").await.unwrap();

    let err = repo
        .preload_all(&mut users, "posts.likes")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidPath);
}

#[tokio::test]
async fn test_unresolvable_keys_are_schema_mismatch() {
    let engine = blog_engine();
    let repo = Repo::new(engine.clone());
    let mut tags = vec![Tag {
        id: 1,
        name: "rust".into(),
        owner: None,
    }];

    let err = repo.preload_all(&mut tags, "owner").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::SchemaMismatch);
    assert!(err.is_preload_error());
    assert!(engine.queries().is_empty());
}

#[tokio::test]
async fn test_mixed_roots_are_invalid_target() {
    let engine = blog_engine();
    let loader = RelationLoader::new(&engine);
    let mut ann = user(1, "ann");
    let mut first = post(10, 1, "first");

    let roots: Vec<&mut dyn Entity> = vec![&mut ann as &mut dyn Entity, &mut first];
    let err = loader
        .preload_dyn(roots, "posts")
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidTarget);
    assert!(engine.queries().is_empty());
}

#[tokio::test]
async fn test_engine_errors_are_translated() {
    let engine = blog_engine();
    engine.fail_next(QueryError::internal("connection reset"));
    let repo = Repo::new(engine);
    let mut users = vec![user(1, "ann")];

    let err = repo.preload_all(&mut users, "posts").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::Internal);
}
