/// Comment service - attaches comments to posts
use crate::cache::IndexCache;
use crate::db::{BlogStore, Reference, StoreError};
use crate::error::{AppError, Result};
use crate::forms::CommentForm;
use crate::metrics::record_mutation;
use crate::models::{Comment, NewComment};
use std::sync::Arc;
use tracing::info;

pub struct CommentService {
    store: Arc<dyn BlogStore>,
    index_cache: IndexCache,
}

impl CommentService {
    pub fn new(store: Arc<dyn BlogStore>, index_cache: IndexCache) -> Self {
        Self { store, index_cache }
    }

    /// Add a comment to an existing post
    pub async fn add_comment(&self, post_id: i64, author_id: i64, form: &CommentForm) -> Result<Comment> {
        if self.store.find_post(post_id).await?.is_none() {
            return Err(AppError::not_found(format!("post {}", post_id)));
        }
        let text = form.clean()?;

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id,
                author_id,
                text,
            })
            .await
            .map_err(|err| match err {
                StoreError::MissingReference(Reference::Post, _) => {
                    AppError::not_found(format!("post {}", post_id))
                }
                other => AppError::from(other),
            })?;

        record_mutation("comment_created");
        self.index_cache.on_write().await;
        info!(comment_id = comment.id, post_id, author_id, "comment added");
        Ok(comment)
    }
}
