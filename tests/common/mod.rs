//! Shared fixtures: an in-memory engine and a small blog schema.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use grimoire::prelude::*;
use grimoire::{DriverError, RelationField};
use parking_lot::Mutex;

/// In-memory engine evaluating the subset of filters the tests need.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    tables: Arc<Mutex<HashMap<String, Vec<Row>>>>,
    queries: Arc<Mutex<Vec<Query>>>,
    events: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<QueryError>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.lock().insert(table.to_string(), rows);
        self
    }

    /// Fail the next engine call with `err`.
    pub fn fail_next(&self, err: QueryError) {
        *self.failure.lock() = Some(err);
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn take_failure(&self) -> Option<DriverError> {
        self.failure
            .lock()
            .take()
            .map(|err| Box::new(err) as DriverError)
    }

    fn select(&self, query: &Query) -> Vec<Row> {
        let tables = self.tables.lock();
        let rows = tables.get(&query.collection).cloned().unwrap_or_default();
        let mut rows: Vec<Row> = rows
            .into_iter()
            .filter(|row| matches(row, &query.condition))
            .collect();
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        rows
    }
}

fn column(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::None => true,
        Filter::Equals(c, v) => row.value(column(c)) == Some(v),
        Filter::In(c, values) => row
            .value(column(c))
            .is_some_and(|v| values.contains(v)),
        Filter::And(parts) => parts.iter().all(|f| matches(row, f)),
        Filter::Or(parts) => parts.iter().any(|f| matches(row, f)),
        other => panic!("unsupported filter in memory engine: {:?}", other),
    }
}

impl QueryEngine for MemoryEngine {
    fn all(&self, query: Query) -> BoxFuture<'_, EngineResult<Vec<Row>>> {
        let result = match self.take_failure() {
            Some(err) => Err(err),
            None => Ok(self.select(&query)),
        };
        self.queries.lock().push(query);
        Box::pin(async move { result })
    }

    fn aggregate(&self, query: Query) -> BoxFuture<'_, EngineResult<FilterValue>> {
        let count = self.select(&query).len() as i64;
        self.queries.lock().push(query);
        Box::pin(async move { Ok(FilterValue::Int(count)) })
    }

    fn insert<'a>(
        &'a self,
        query: Query,
        changes: &'a Changes,
    ) -> BoxFuture<'a, EngineResult<FilterValue>> {
        let result = match self.take_failure() {
            Some(err) => Err(err),
            None => {
                let mut tables = self.tables.lock();
                let rows = tables.entry(query.collection.clone()).or_default();
                let id = rows.len() as i64 + 1;
                let mut row = Row::new().with("id", id);
                for change in changes {
                    row.insert(change.field.clone(), change.value.clone());
                }
                rows.push(row);
                Ok(FilterValue::Int(id))
            }
        };
        self.queries.lock().push(query);
        Box::pin(async move { result })
    }

    fn update<'a>(
        &'a self,
        query: Query,
        changes: &'a Changes,
    ) -> BoxFuture<'a, EngineResult<u64>> {
        let result = match self.take_failure() {
            Some(err) => Err(err),
            None => {
                let mut tables = self.tables.lock();
                let mut updated = 0;
                if let Some(rows) = tables.get_mut(&query.collection) {
                    for row in rows.iter_mut().filter(|r| matches(r, &query.condition)) {
                        for change in changes {
                            row.insert(change.field.clone(), change.value.clone());
                        }
                        updated += 1;
                    }
                }
                Ok(updated)
            }
        };
        self.queries.lock().push(query);
        Box::pin(async move { result })
    }

    fn delete(&self, query: Query) -> BoxFuture<'_, EngineResult<u64>> {
        let deleted = match self.tables.lock().get_mut(&query.collection) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|r| !matches(r, &query.condition));
                (before - rows.len()) as u64
            }
            None => 0,
        };
        self.queries.lock().push(query);
        Box::pin(async move { Ok(deleted) })
    }

    fn begin<'a>(&'a self, config: &'a TransactionConfig) -> BoxFuture<'a, EngineResult<()>> {
        self.events
            .lock()
            .push(format!("begin {}", config.isolation.as_str()));
        Box::pin(async { Ok(()) })
    }

    fn commit(&self) -> BoxFuture<'_, EngineResult<()>> {
        self.events.lock().push("commit".into());
        Box::pin(async { Ok(()) })
    }

    fn rollback(&self) -> BoxFuture<'_, EngineResult<()>> {
        self.events.lock().push("rollback".into());
        Box::pin(async { Ok(()) })
    }
}

// ============== Blog schema ==============

const USER_SCHEMA: Schema = Schema::new("User", "users").fields(&["id", "name"]);
const POST_SCHEMA: Schema = Schema::new("Post", "posts").fields(&["id", "user_id", "title"]);
const COMMENT_SCHEMA: Schema =
    Schema::new("Comment", "comments").fields(&["id", "post_id", "parent_id", "body"]);
const PROFILE_SCHEMA: Schema = Schema::new("Profile", "profiles").fields(&["id", "user_id", "bio"]);

const WRITER: RelationField = RelationField::new("writer")
    .references("writer_uid")
    .foreign_key("id");
const ARTICLE_SCHEMA: Schema = Schema::new("Article", "articles")
    .fields(&["id", "writer_uid", "title"])
    .relations(&[WRITER]);

const TAG_SCHEMA: Schema = Schema::new("Tag", "tags").fields(&["id", "name"]);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub posts: Vec<Post>,
    pub profile: Option<Profile>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            ..Self::default()
        })
    }
}

impl Entity for User {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, name: &str) -> Option<Slot<'_>> {
        match name {
            "posts" => Some(Slot::many(&mut self.posts)),
            "profile" => Some(Slot::optional(&mut self.profile)),
            _ => None,
        }
    }
}

impl Model for User {
    const SCHEMA: &'static Schema = &USER_SCHEMA;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub user: Option<User>,
    pub comments: Vec<Comment>,
}

impl FromRow for Post {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            ..Self::default()
        })
    }
}

impl Entity for Post {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "title" => Some(self.title.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, name: &str) -> Option<Slot<'_>> {
        match name {
            "user" => Some(Slot::optional(&mut self.user)),
            "comments" => Some(Slot::many(&mut self.comments)),
            _ => None,
        }
    }
}

impl Model for Post {
    const SCHEMA: &'static Schema = &POST_SCHEMA;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
    pub parent: Option<Box<Comment>>,
}

impl FromRow for Comment {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            post_id: row.get("post_id")?,
            parent_id: row.get("parent_id")?,
            body: row.get("body")?,
            parent: None,
        })
    }
}

impl Entity for Comment {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "post_id" => Some(self.post_id.into()),
            "parent_id" => Some(self.parent_id.into()),
            "body" => Some(self.body.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, name: &str) -> Option<Slot<'_>> {
        match name {
            "parent" => Some(Slot::boxed(&mut self.parent)),
            _ => None,
        }
    }
}

impl Model for Comment {
    const SCHEMA: &'static Schema = &COMMENT_SCHEMA;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: String,
}

impl FromRow for Profile {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bio: row.get("bio")?,
        })
    }
}

impl Entity for Profile {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "bio" => Some(self.bio.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, _name: &str) -> Option<Slot<'_>> {
        None
    }
}

impl Model for Profile {
    const SCHEMA: &'static Schema = &PROFILE_SCHEMA;
}

/// Belongs to a user through a declared, non-conventional key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub id: i64,
    pub writer_uid: i64,
    pub title: String,
    pub writer: User,
}

impl FromRow for Article {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            writer_uid: row.get("writer_uid")?,
            title: row.get("title")?,
            writer: User::default(),
        })
    }
}

impl Entity for Article {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "writer_uid" => Some(self.writer_uid.into()),
            "title" => Some(self.title.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, name: &str) -> Option<Slot<'_>> {
        match name {
            "writer" => Some(Slot::one(&mut self.writer)),
            _ => None,
        }
    }
}

impl Model for Article {
    const SCHEMA: &'static Schema = &ARTICLE_SCHEMA;
}

/// Declares an `owner` relation whose keys cannot be inferred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner: Option<User>,
}

impl FromRow for Tag {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            owner: None,
        })
    }
}

impl Entity for Tag {
    fn schema(&self) -> &'static Schema {
        Self::SCHEMA
    }

    fn field(&self, name: &str) -> Option<FilterValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }

    fn relation(&mut self, name: &str) -> Option<Slot<'_>> {
        match name {
            "owner" => Some(Slot::optional(&mut self.owner)),
            _ => None,
        }
    }
}

impl Model for Tag {
    const SCHEMA: &'static Schema = &TAG_SCHEMA;
}

// ============== Seed data ==============

pub fn user_row(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

pub fn post_row(id: i64, user_id: i64, title: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("title", title)
}

pub fn comment_row(id: i64, post_id: i64, parent_id: Option<i64>, body: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("post_id", post_id)
        .with("parent_id", parent_id)
        .with("body", body)
}

pub fn profile_row(id: i64, user_id: i64, bio: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("bio", bio)
}

/// Users 1 and 2 with posts; user 3 has none.
pub fn blog_engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_rows(
            "users",
            vec![user_row(1, "ann"), user_row(2, "bob"), user_row(3, "cy")],
        )
        .with_rows(
            "posts",
            vec![
                post_row(10, 1, "first"),
                post_row(11, 1, "second"),
                post_row(12, 2, "hello"),
            ],
        )
        .with_rows(
            "comments",
            vec![
                comment_row(100, 10, None, "nice"),
                comment_row(101, 10, Some(100), "agreed"),
                comment_row(102, 12, None, "hi"),
            ],
        )
        .with_rows("profiles", vec![profile_row(1, 2, "bob's bio")])
}

pub fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        ..User::default()
    }
}

pub fn post(id: i64, user_id: i64, title: &str) -> Post {
    Post {
        id,
        user_id,
        title: title.to_string(),
        ..Post::default()
    }
}
