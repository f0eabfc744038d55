use crate::cache::IndexCache;
use crate::db::BlogStore;
use crate::error::{AppError, Result};
use crate::metrics::record_mutation;
use std::sync::Arc;
use tracing::info;

/// What a follow request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is silently ignored.
    SelfFollow,
}

pub struct FollowService {
    store: Arc<dyn BlogStore>,
    index_cache: IndexCache,
}

impl FollowService {
    pub fn new(store: Arc<dyn BlogStore>, index_cache: IndexCache) -> Self {
        Self { store, index_cache }
    }

    /// Get-or-create the edge `follower_id -> username`.
    pub async fn follow(&self, follower_id: i64, username: &str) -> Result<FollowOutcome> {
        let author_id = self.author_id(username).await?;
        if author_id == follower_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        if !self.store.create_follow(follower_id, author_id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        record_mutation("follow_created");
        self.index_cache.on_write().await;
        info!(follower_id, author_id, "follow created");
        Ok(FollowOutcome::Created)
    }

    /// Delete the edge; NotFound when there was none.
    pub async fn unfollow(&self, follower_id: i64, username: &str) -> Result<()> {
        let author_id = self.author_id(username).await?;
        if !self.store.delete_follow(follower_id, author_id).await? {
            return Err(AppError::not_found(format!(
                "follow {} -> {}",
                follower_id, username
            )));
        }

        record_mutation("follow_deleted");
        self.index_cache.on_write().await;
        info!(follower_id, author_id, "follow deleted");
        Ok(())
    }

    pub async fn is_following(&self, follower_id: i64, username: &str) -> Result<bool> {
        let author_id = self.author_id(username).await?;
        Ok(self.store.is_following(follower_id, author_id).await?)
    }

    async fn author_id(&self, username: &str) -> Result<i64> {
        self.store
            .find_user_by_username(username)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| AppError::not_found(format!("user '{}'", username)))
    }
}
