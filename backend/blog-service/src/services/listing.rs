/// Listing service - ordered, paginated read views over posts
use crate::db::BlogStore;
use crate::error::{AppError, Result};
use crate::middleware::{can_edit, CurrentUser};
use crate::models::{Comment, Group, Post, PostFilter, User};
use crate::pagination::{Page, PageWindow, Paginator};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct GroupPage {
    pub group: Group,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub author: User,
    pub page_obj: Page<Post>,
    /// Whether the viewer follows `author`; always false for anonymous viewers.
    pub following: bool,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub author: User,
    pub post: Post,
    /// Oldest first
    pub comments: Vec<Comment>,
    pub user_can_edit: bool,
}

pub struct ListingService {
    store: Arc<dyn BlogStore>,
    paginator: Paginator,
}

impl ListingService {
    pub fn new(store: Arc<dyn BlogStore>, paginator: Paginator) -> Self {
        Self { store, paginator }
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// All posts, newest first.
    pub async fn list_all(&self, page: Option<&str>) -> Result<Page<Post>> {
        self.paginate(PostFilter::All, page).await
    }

    /// Resolve the requested page of the full listing without loading it.
    pub async fn resolve_all(&self, page: Option<&str>) -> Result<(PageWindow, i64)> {
        self.resolve(PostFilter::All, page).await
    }

    /// Load a window of the full listing previously resolved by `resolve_all`.
    pub async fn list_all_window(&self, window: PageWindow, count: i64) -> Result<Page<Post>> {
        self.load(PostFilter::All, window, count).await
    }

    /// Posts filed under the group with `slug`.
    pub async fn list_by_group(&self, slug: &str, page: Option<&str>) -> Result<GroupPage> {
        let group = self
            .store
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found(format!("group '{}'", slug)))?;

        let page_obj = self.paginate(PostFilter::Group(group.id), page).await?;
        Ok(GroupPage { group, page_obj })
    }

    /// Posts written by `username`, plus whether the viewer follows them.
    pub async fn list_by_author(
        &self,
        username: &str,
        page: Option<&str>,
        viewer: Option<&CurrentUser>,
    ) -> Result<ProfilePage> {
        let author = self.find_author(username).await?;

        let following = match viewer {
            Some(viewer) => self.store.is_following(viewer.id, author.id).await?,
            None => false,
        };

        let page_obj = self.paginate(PostFilter::Author(author.id), page).await?;
        Ok(ProfilePage {
            author,
            page_obj,
            following,
        })
    }

    /// Posts by every author `viewer_id` follows.
    pub async fn list_followed_feed(&self, viewer_id: i64, page: Option<&str>) -> Result<Page<Post>> {
        self.paginate(PostFilter::FollowedBy(viewer_id), page).await
    }

    pub async fn post_detail(&self, post_id: i64, viewer: Option<&CurrentUser>) -> Result<PostDetail> {
        let post = self.find_post(post_id).await?;
        let comments = self.store.list_comments(post.id).await?;

        Ok(PostDetail {
            author: post.author.clone(),
            user_can_edit: can_edit(viewer, &post),
            post,
            comments,
        })
    }

    pub async fn find_post(&self, post_id: i64) -> Result<Post> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))
    }

    pub async fn find_author(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user '{}'", username)))
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.store.list_groups().await?)
    }

    async fn paginate(&self, filter: PostFilter, page: Option<&str>) -> Result<Page<Post>> {
        let (window, count) = self.resolve(filter, page).await?;
        self.load(filter, window, count).await
    }

    async fn resolve(&self, filter: PostFilter, page: Option<&str>) -> Result<(PageWindow, i64)> {
        let count = self.store.count_posts(filter).await?;
        Ok((self.paginator.window(page, count), count))
    }

    async fn load(&self, filter: PostFilter, window: PageWindow, count: i64) -> Result<Page<Post>> {
        let posts = self
            .store
            .list_posts(filter, window.limit, window.offset)
            .await?;

        tracing::debug!(
            ?filter,
            page = window.number,
            num_pages = window.num_pages,
            "listed posts"
        );
        Ok(Page::new(posts, window, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewComment, NewGroup, NewPost};

    async fn seeded() -> (Arc<MemoryStore>, ListingService) {
        let store = Arc::new(MemoryStore::new());
        let service = ListingService::new(store.clone(), Paginator::new(10));
        (store, service)
    }

    async fn post(store: &MemoryStore, author_id: i64, group_id: Option<i64>) -> Post {
        store
            .insert_post(NewPost {
                author_id,
                text: "Тестовый пост".to_string(),
                group_id,
                image: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn group_listing_excludes_other_groups() {
        let (store, service) = seeded().await;
        let author = store.create_user("auth").await.unwrap();
        let group = store
            .create_group(NewGroup {
                slug: "test_slug".into(),
                title: "Тестовая группа".into(),
                description: "Тестовое описание".into(),
            })
            .await
            .unwrap();
        let other = store
            .create_group(NewGroup {
                slug: "other_slug".into(),
                title: "Другая группа".into(),
                description: "".into(),
            })
            .await
            .unwrap();
        let grouped = post(&store, author.id, Some(group.id)).await;
        post(&store, author.id, None).await;

        let listing = service.list_by_group("test_slug", None).await.unwrap();
        assert_eq!(listing.page_obj.object_list, vec![grouped]);

        let other_listing = service.list_by_group(&other.slug, None).await.unwrap();
        assert!(other_listing.page_obj.is_empty());
    }

    #[tokio::test]
    async fn unknown_group_and_author_are_not_found() {
        let (_, service) = seeded().await;
        assert!(matches!(
            service.list_by_group("missing", None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.list_by_author("ghost", None, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn profile_reports_following_only_for_followers() {
        let (store, service) = seeded().await;
        let author = store.create_user("author").await.unwrap();
        let reader = store.create_user("reader").await.unwrap();
        post(&store, author.id, None).await;
        store.create_follow(reader.id, author.id).await.unwrap();

        let viewer = CurrentUser {
            id: reader.id,
            username: reader.username.clone(),
        };
        let profile = service
            .list_by_author("author", None, Some(&viewer))
            .await
            .unwrap();
        assert!(profile.following);
        assert_eq!(profile.page_obj.count, 1);

        let anonymous = service.list_by_author("author", None, None).await.unwrap();
        assert!(!anonymous.following);
    }

    #[tokio::test]
    async fn feed_contains_only_followed_authors() {
        let (store, service) = seeded().await;
        let followed = store.create_user("followed").await.unwrap();
        let stranger = store.create_user("stranger").await.unwrap();
        let reader = store.create_user("reader").await.unwrap();
        let followed_post = post(&store, followed.id, None).await;
        post(&store, stranger.id, None).await;
        store.create_follow(reader.id, followed.id).await.unwrap();

        let feed = service.list_followed_feed(reader.id, None).await.unwrap();
        assert_eq!(feed.object_list, vec![followed_post]);

        let empty = service.list_followed_feed(stranger.id, None).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.num_pages, 1);
    }

    #[tokio::test]
    async fn detail_lists_comments_oldest_first() {
        let (store, service) = seeded().await;
        let author = store.create_user("author").await.unwrap();
        let target = post(&store, author.id, None).await;
        for text in ["first", "second"] {
            store
                .insert_comment(NewComment {
                    post_id: target.id,
                    author_id: author.id,
                    text: text.to_string(),
                })
                .await
                .unwrap();
        }

        let viewer = CurrentUser {
            id: author.id,
            username: author.username.clone(),
        };
        let detail = service.post_detail(target.id, Some(&viewer)).await.unwrap();
        let texts: Vec<_> = detail.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(detail.user_can_edit);

        let anonymous = service.post_detail(target.id, None).await.unwrap();
        assert!(!anonymous.user_can_edit);
        assert!(matches!(
            service.post_detail(target.id + 100, None).await,
            Err(AppError::NotFound(_))
        ));
    }
}
