/// Post service - handles post creation and author edits
use crate::cache::IndexCache;
use crate::db::{BlogStore, Reference, StoreError};
use crate::error::{AppError, Result};
use crate::forms::{CleanedPost, FormErrors, PostForm, INVALID_GROUP_MESSAGE};
use crate::metrics::record_mutation;
use crate::middleware::check_post_ownership;
use crate::models::{NewPost, Post, PostChanges};
use std::sync::Arc;
use tracing::info;

pub struct PostService {
    store: Arc<dyn BlogStore>,
    index_cache: IndexCache,
}

impl PostService {
    pub fn new(store: Arc<dyn BlogStore>, index_cache: IndexCache) -> Self {
        Self { store, index_cache }
    }

    /// Create a new post authored by `author_id`
    pub async fn create_post(&self, author_id: i64, form: &PostForm) -> Result<Post> {
        let cleaned = form.clean()?;
        self.ensure_group_exists(cleaned.group_id).await?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id,
                text: cleaned.text,
                group_id: cleaned.group_id,
                image: cleaned.image,
            })
            .await
            .map_err(reference_error)?;

        record_mutation("post_created");
        self.index_cache.on_write().await;
        info!(post_id = post.id, author_id, "post created");
        Ok(post)
    }

    /// Load a post for editing; only its author gets it back.
    pub async fn editable_post(&self, post_id: i64, editor_id: i64) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;
        check_post_ownership(editor_id, &post)?;
        Ok(post)
    }

    /// Apply an author's edit.
    ///
    /// Checks run in order: unknown post, foreign author, invalid form.
    pub async fn update_post(&self, post_id: i64, editor_id: i64, form: &PostForm) -> Result<Post> {
        let current = self.editable_post(post_id, editor_id).await?;
        let cleaned = form.clean()?;
        self.ensure_group_exists(cleaned.group_id).await?;

        let changes = changes_for(&current, cleaned);
        let updated = self
            .store
            .update_post(post_id, editor_id, changes)
            .await
            .map_err(reference_error)?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

        record_mutation("post_updated");
        self.index_cache.on_write().await;
        info!(post_id, editor_id, "post updated");
        Ok(updated)
    }

    async fn ensure_group_exists(&self, group_id: Option<i64>) -> Result<()> {
        let Some(group_id) = group_id else {
            return Ok(());
        };
        if self.store.find_group(group_id).await?.is_some() {
            return Ok(());
        }
        Err(invalid_group())
    }
}

/// A fresh upload replaces the image, the clear checkbox drops it, otherwise it stays.
fn changes_for(current: &Post, cleaned: CleanedPost) -> PostChanges {
    let image = match (cleaned.image, cleaned.clear_image) {
        (Some(image), _) => Some(image),
        (None, true) => None,
        (None, false) => current.image.clone(),
    };

    PostChanges {
        text: cleaned.text,
        group_id: cleaned.group_id,
        image,
    }
}

fn invalid_group() -> AppError {
    let mut errors = FormErrors::new();
    errors.add("group", INVALID_GROUP_MESSAGE);
    AppError::Validation(errors)
}

/// The group can vanish between the existence check and the write.
fn reference_error(err: StoreError) -> AppError {
    match err {
        StoreError::MissingReference(Reference::Group, _) => invalid_group(),
        other => AppError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewGroup, PostFilter};
    use std::time::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PostService,
        author_id: i64,
        other_id: i64,
        group_id: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let author_id = store.create_user("auth").await.unwrap().id;
        let other_id = store.create_user("other").await.unwrap().id;
        let group_id = store
            .create_group(NewGroup {
                slug: "test_slug".into(),
                title: "Тестовая группа".into(),
                description: "Тестовое описание".into(),
            })
            .await
            .unwrap()
            .id;
        let service = PostService::new(
            store.clone(),
            IndexCache::in_memory(Duration::from_secs(20)),
        );
        Fixture {
            store,
            service,
            author_id,
            other_id,
            group_id,
        }
    }

    #[tokio::test]
    async fn create_post_persists_fields() {
        let f = fixture().await;
        let form = PostForm::new("Тестовый текст")
            .with_group(f.group_id)
            .with_image("posts/small.gif");

        let post = f.service.create_post(f.author_id, &form).await.unwrap();

        assert_eq!(post.text, "Тестовый текст");
        assert_eq!(post.author.id, f.author_id);
        assert_eq!(post.group_id(), Some(f.group_id));
        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
        assert_eq!(f.store.count_posts(PostFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn blank_text_creates_nothing() {
        let f = fixture().await;
        let err = f
            .service
            .create_post(f.author_id, &PostForm::new("   "))
            .await
            .unwrap_err();

        assert!(err.form_errors().unwrap().has_field("text"));
        assert_eq!(f.store.count_posts(PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_group_is_a_group_error() {
        let f = fixture().await;
        let err = f
            .service
            .create_post(f.author_id, &PostForm::new("text").with_group(f.group_id + 100))
            .await
            .unwrap_err();

        assert!(err.form_errors().unwrap().has_field("group"));
    }

    #[tokio::test]
    async fn non_author_update_never_mutates() {
        let f = fixture().await;
        let post = f
            .service
            .create_post(f.author_id, &PostForm::new("original"))
            .await
            .unwrap();

        let err = f
            .service
            .update_post(post.id, f.other_id, &PostForm::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthor { .. }));

        let stored = f.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "original");
    }

    #[tokio::test]
    async fn update_of_unknown_post_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .update_post(999, f.author_id, &PostForm::new("text"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_keeps_image_unless_cleared() {
        let f = fixture().await;
        let post = f
            .service
            .create_post(f.author_id, &PostForm::new("text").with_image("posts/a.gif"))
            .await
            .unwrap();

        let kept = f
            .service
            .update_post(post.id, f.author_id, &PostForm::new("edited"))
            .await
            .unwrap();
        assert_eq!(kept.text, "edited");
        assert_eq!(kept.image.as_deref(), Some("posts/a.gif"));
        assert_eq!(kept.pub_date, post.pub_date);

        let mut clear = PostForm::new("edited again");
        clear.image_clear = Some("on".to_string());
        let cleared = f
            .service
            .update_post(post.id, f.author_id, &clear)
            .await
            .unwrap();
        assert_eq!(cleared.image, None);
    }

    #[tokio::test]
    async fn update_with_blank_text_is_rejected() {
        let f = fixture().await;
        let post = f
            .service
            .create_post(f.author_id, &PostForm::new("original").with_group(f.group_id))
            .await
            .unwrap();

        let err = f
            .service
            .update_post(post.id, f.author_id, &PostForm::new(""))
            .await
            .unwrap_err();
        assert!(err.form_errors().unwrap().has_field("text"));

        let stored = f.store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(stored, post);
    }

    #[tokio::test]
    async fn missing_author_is_not_reported_as_a_group_error() {
        let f = fixture().await;
        let err = f
            .service
            .create_post(f.author_id + 100, &PostForm::new("text"))
            .await
            .unwrap_err();

        assert!(err.form_errors().is_none());
        assert!(matches!(
            err,
            AppError::Store(StoreError::MissingReference(Reference::User, _))
        ));
    }
}
