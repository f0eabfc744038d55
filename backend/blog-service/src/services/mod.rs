/// Business logic layer for blog-service
///
/// This module provides:
/// - ListingService: ordered, paginated views over posts
/// - PostService: post creation and author edits
/// - CommentService: comments on posts
/// - FollowService: follow edges between users
pub mod comments;
pub mod follow;
pub mod listing;
pub mod posts;

pub use comments::CommentService;
pub use follow::{FollowOutcome, FollowService};
pub use listing::{GroupPage, ListingService, PostDetail, ProfilePage};
pub use posts::PostService;
