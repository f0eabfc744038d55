use crate::db::{BlogStore, Reference, StoreError, StoreResult};
use crate::models::{
    Comment, Group, GroupRef, NewComment, NewGroup, NewPost, Post, PostChanges, PostFilter, User,
};
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const POST_SELECT: &str = r#"
    SELECT p.id, p.text, p.pub_date, p.image,
           u.id AS author_id, u.username AS author_username,
           g.id AS group_id, g.slug AS group_slug, g.title AS group_title
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.text, c.created,
           u.id AS author_id, u.username AS author_username
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Create a PostgreSQL connection pool
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    debug!(max_connections, "Creating database pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("Database pool created");
    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: DateTime<Utc>,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };

        Post {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author: User {
                id: row.author_id,
                username: row.author_username,
            },
            group,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    text: String,
    created: DateTime<Utc>,
    author_id: i64,
    author_username: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author: User {
                id: row.author_id,
                username: row.author_username,
            },
            text: row.text,
            created: row.created,
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            qb.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            qb.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            qb.push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

fn map_write_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(format!("{} already exists", what));
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return StoreError::MissingReference(
                referenced_by(constraint),
                format!("{} violates {}", what, constraint),
            );
        }
        if db_err.is_check_violation() {
            return StoreError::Constraint(format!("{} rejected by check constraint", what));
        }
    }
    StoreError::Database(err)
}

/// Resolve a foreign key constraint name (`posts_group_id_fkey`, ...) to the table it points at.
fn referenced_by(constraint: &str) -> Reference {
    if constraint.contains("group_id") {
        Reference::Group
    } else if constraint.contains("post_id") {
        Reference::Post
    } else {
        Reference::User
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_post<'e, E>(executor: E, post_id: i64) -> Result<Option<Post>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = format!("{} WHERE p.id = $1", POST_SELECT);
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(Post::from))
    }
}

#[async_trait::async_trait]
impl BlogStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id, username
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "user"))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (slug, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, slug, title, description
            "#,
        )
        .bind(&group.slug)
        .bind(&group.title)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "group"))
    }

    async fn find_group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn find_group(&self, group_id: i64) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM post_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM post_groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM post_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let (post_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (author_id, text, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(post.author_id)
        .bind(&post.text)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "post"))?;

        let created = Self::fetch_post(&mut *tx, post_id)
            .await?
            .ok_or_else(|| {
                StoreError::MissingReference(Reference::Post, format!("post {} vanished", post_id))
            })?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        Ok(Self::fetch_post(&self.pool, post_id).await?)
    }

    async fn update_post(
        &self,
        post_id: i64,
        author_id: i64,
        changes: PostChanges,
    ) -> StoreResult<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, (i64,)>(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2, image = $3
            WHERE id = $4 AND author_id = $5
            RETURNING id
            "#,
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .bind(post_id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "post"))?;

        if updated.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let post = Self::fetch_post(&mut *tx, post_id).await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn count_posts(&self, filter: PostFilter) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut qb, filter);
        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<PostRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let (comment_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "comment"))?;

        let sql = format!("{} WHERE c.id = $1", COMMENT_SELECT);
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list_comments(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "{} WHERE c.post_id = $1 ORDER BY c.created ASC, c.id ASC",
            COMMENT_SELECT
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn create_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let inserted = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "follow"))?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE user_id = $1 AND author_id = $2
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_names_resolve_to_referenced_table() {
        assert_eq!(referenced_by("posts_group_id_fkey"), Reference::Group);
        assert_eq!(referenced_by("comments_post_id_fkey"), Reference::Post);
        assert_eq!(referenced_by("posts_author_id_fkey"), Reference::User);
        assert_eq!(referenced_by("follows_user_id_fkey"), Reference::User);
    }
}
