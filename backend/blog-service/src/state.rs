use crate::cache::IndexCache;
use crate::db::BlogStore;
use crate::pagination::Paginator;
use crate::services::{CommentService, FollowService, ListingService, PostService};
use std::sync::Arc;

/// Services shared by every worker, handed to handlers as `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub index_cache: IndexCache,
    pub listing: ListingService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
}

impl AppState {
    pub fn new(store: Arc<dyn BlogStore>, index_cache: IndexCache, paginator: Paginator) -> Self {
        Self {
            listing: ListingService::new(store.clone(), paginator),
            posts: PostService::new(store.clone(), index_cache.clone()),
            comments: CommentService::new(store.clone(), index_cache.clone()),
            follows: FollowService::new(store.clone(), index_cache.clone()),
            index_cache,
            store,
        }
    }
}
