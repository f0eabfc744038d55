/// In-process store
///
/// Holds every table behind a single lock so that each operation is applied
/// atomically, mirroring the transactional behavior of `PgStore`.
use crate::db::{BlogStore, Reference, StoreError, StoreResult};
use crate::models::{
    Comment, Follow, Group, GroupRef, NewComment, NewGroup, NewPost, Post, PostChanges,
    PostFilter, User,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct PostRecord {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    follows: BTreeMap<i64, Follow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user(&self, user_id: i64) -> StoreResult<User> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::MissingReference(Reference::User, format!("user {}", user_id))
            })
    }

    fn post_view(&self, record: &PostRecord) -> StoreResult<Post> {
        let group = record
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(GroupRef::from);

        Ok(Post {
            id: record.id,
            text: record.text.clone(),
            pub_date: record.pub_date,
            author: self.user(record.author_id)?,
            group,
            image: record.image.clone(),
        })
    }

    fn comment_view(&self, record: &CommentRecord) -> StoreResult<Comment> {
        Ok(Comment {
            id: record.id,
            post_id: record.post_id,
            author: self.user(record.author_id)?,
            text: record.text.clone(),
            created: record.created,
        })
    }

    fn follows(&self, user_id: i64, author_id: i64) -> bool {
        self.follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
    }

    fn matches(&self, record: &PostRecord, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => record.group_id == Some(group_id),
            PostFilter::Author(author_id) => record.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self.follows(user_id, record.author_id),
        }
    }

    fn ordered(&self, filter: PostFilter) -> Vec<&PostRecord> {
        let mut records: Vec<&PostRecord> = self
            .posts
            .values()
            .filter(|record| self.matches(record, filter))
            .collect();
        records.sort_by_key(|record| Reverse((record.pub_date, record.id)));
        records
    }

    fn check_group(&self, group_id: Option<i64>) -> StoreResult<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(StoreError::MissingReference(
                    Reference::Group,
                    format!("group {}", id),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BlogStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, username: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let owned_posts: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|_, p| p.author_id != user_id);
        tables
            .comments
            .retain(|_, c| c.author_id != user_id && !owned_posts.contains(&c.post_id));
        tables
            .follows
            .retain(|_, f| f.user_id != user_id && f.author_id != user_id);
        Ok(true)
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(StoreError::Conflict("group already exists".to_string()));
        }

        let group = Group {
            id: tables.next_id(),
            slug: group.slug,
            title: group.title,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.get(&group_id).cloned())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&group_id).is_none() {
            return Ok(false);
        }

        for post in tables.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        tables.user(post.author_id)?;
        tables.check_group(post.group_id)?;

        let record = PostRecord {
            id: tables.next_id(),
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        let view = tables.post_view(&record)?;
        tables.posts.insert(record.id, record);
        Ok(view)
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&post_id)
            .map(|record| tables.post_view(record))
            .transpose()
    }

    async fn update_post(
        &self,
        post_id: i64,
        author_id: i64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        tables.check_group(changes.group_id)?;

        let record = match tables.posts.get_mut(&post_id) {
            Some(record) if record.author_id == author_id => record,
            _ => return Ok(None),
        };
        record.text = changes.text;
        record.group_id = changes.group_id;
        record.image = changes.image;

        let record = record.clone();
        tables.post_view(&record).map(Some)
    }

    async fn count_posts(&self, filter: PostFilter) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.ordered(filter).len() as i64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        tables
            .ordered(filter)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|record| tables.post_view(record))
            .collect()
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        tables.user(comment.author_id)?;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::MissingReference(
                Reference::Post,
                format!("post {}", comment.post_id),
            ));
        }

        let record = CommentRecord {
            id: tables.next_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        let view = tables.comment_view(&record)?;
        tables.comments.insert(record.id, record);
        Ok(view)
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut records: Vec<&CommentRecord> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        records.sort_by_key(|c| (c.created, c.id));
        records
            .into_iter()
            .map(|record| tables.comment_view(record))
            .collect()
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if user_id == author_id {
            return Err(StoreError::Constraint(
                "follow rejected by check constraint".to_string(),
            ));
        }
        tables.user(user_id)?;
        tables.user(author_id)?;
        if tables.follows(user_id, author_id) {
            return Ok(false);
        }

        let follow = Follow {
            id: tables.next_id(),
            user_id,
            author_id,
        };
        tables.follows.insert(follow.id, follow);
        Ok(true)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.follows(user_id, author_id))
    }
}
