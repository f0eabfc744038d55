/// Database access layer
///
/// This module provides:
/// - `BlogStore`: the persistence port every service talks to
/// - `PgStore`: PostgreSQL implementation backed by sqlx
/// - `MemoryStore`: in-process implementation for tests and local runs
///
/// Every mutating method is atomic: an implementation either applies the whole
/// write or none of it.
pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::{connect, PgStore, MIGRATOR};

use crate::models::{
    Comment, Group, NewComment, NewGroup, NewPost, Post, PostChanges, PostFilter, User,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint rejected the write (duplicate username, slug, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The write referenced a row that does not exist.
    #[error("Missing {0} reference: {1}")]
    MissingReference(Reference, String),

    /// A check constraint rejected the write.
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// Which foreign row a write pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    User,
    Group,
    Post,
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Reference::User => "user",
            Reference::Group => "group",
            Reference::Post => "post",
        })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for users, groups, posts, comments and follow edges.
///
/// Post listings are always ordered newest first by `pub_date`, ties broken by
/// id descending.
#[async_trait::async_trait]
pub trait BlogStore: Send + Sync {
    /// Cheap connectivity check used by health probes.
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, username: &str) -> StoreResult<User>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;

    /// Deletes a user along with their posts, comments and follow edges.
    async fn delete_user(&self, user_id: i64) -> StoreResult<bool>;

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group>;

    async fn find_group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>>;

    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>>;

    /// All groups ordered by title.
    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    /// Deletes a group; its posts stay and lose their group reference.
    async fn delete_group(&self, group_id: i64) -> StoreResult<bool>;

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>>;

    /// Applies `changes` only when `author_id` owns the post.
    /// Returns `None` when no post matched.
    async fn update_post(
        &self,
        post_id: i64,
        author_id: i64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>>;

    async fn count_posts(&self, filter: PostFilter) -> StoreResult<i64>;

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Post>>;

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>>;

    /// Idempotent create; returns true if a new edge was inserted.
    async fn create_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool>;

    /// Returns true if an edge was removed.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> StoreResult<bool>;
}
