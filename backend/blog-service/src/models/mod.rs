/// Data models for blog-service
///
/// This module defines structures for:
/// - User: an author identity with a unique username
/// - Group: a topic posts can be filed under
/// - Post: a user-authored text entry, optionally grouped and illustrated
/// - Comment: a reply attached to a post
/// - Follow: a directed subscription edge between two users
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters a post shows when displayed in listings and admin views.
pub const POST_DISPLAY_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Group summary embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            slug: group.slug.clone(),
            title: group.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: User,
    pub group: Option<GroupRef>,
    /// Storage key of the attached image; the media store itself lives elsewhere.
    pub image: Option<String>,
}

impl Post {
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author.id == user_id
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group.as_ref().map(|g| g.id)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.text.chars().take(POST_DISPLAY_CHARS).collect();
        f.write_str(&short)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: User,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Directed edge: `user_id` follows `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}

/// Which slice of the post table a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts whose author is followed by the given user.
    FollowedBy(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Full replacement values for the mutable columns of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}
