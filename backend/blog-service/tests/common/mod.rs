//! Shared fixtures for the HTTP tests.
//!
//! Every test gets its own in-memory store and index cache, so tests can run
//! in parallel without sharing state.
#![allow(dead_code)]

use actix_web::web;
use blog_service::cache::IndexCache;
use blog_service::db::{BlogStore, MemoryStore};
use blog_service::middleware::SessionSettings;
use blog_service::models::{Group, NewGroup, NewPost, Post, User};
use blog_service::pagination::Paginator;
use blog_service::AppState;
use std::sync::Arc;
use std::time::Duration;

pub const SECRET: &str = "test-session-secret";
pub const COOKIE: &str = "sessionid";
pub const LOGIN_URL: &str = "/auth/login/";

/// Build the full application the way `main` does, around `$state`.
#[macro_export]
macro_rules! blog_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .app_data(actix_web::web::Data::new($crate::common::settings()))
                .wrap(blog_service::middleware::SessionAuth::new(
                    $crate::common::settings(),
                ))
                .route(
                    "/health",
                    actix_web::web::get().to(blog_service::handlers::health),
                )
                .configure(blog_service::handlers::configure)
                .default_service(actix_web::web::route().to(blog_service::handlers::not_found)),
        )
        .await
    };
}

pub fn settings() -> SessionSettings {
    SessionSettings::new(SECRET, COOKIE, LOGIN_URL)
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub cache: IndexCache,
    pub state: web::Data<AppState>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cache(IndexCache::in_memory(Duration::from_secs(20)))
    }

    pub fn with_cache(cache: IndexCache) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = web::Data::new(AppState::new(store.clone(), cache.clone(), Paginator::new(10)));
        Self {
            store,
            cache,
            state,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.store.create_user(username).await.expect("create user")
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.store
            .create_group(NewGroup {
                slug: slug.to_string(),
                title: format!("Группа {}", slug),
                description: "Тестовое описание".to_string(),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.store
            .insert_post(NewPost {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("insert post")
    }

    pub async fn posts(&self, author: &User, count: usize, group: Option<&Group>) -> Vec<Post> {
        let mut posts = Vec::with_capacity(count);
        for i in 0..count {
            posts.push(self.post(author, &format!("Тестовый пост {}", i), group).await);
        }
        posts
    }
}

/// `Authorization` header value for a logged-in `user`.
pub fn bearer(user: &User) -> (&'static str, String) {
    let token = settings()
        .issue_token(user, chrono::Duration::hours(1))
        .expect("issue token");
    ("Authorization", format!("Bearer {}", token))
}

/// Session cookie for a logged-in `user`.
pub fn session_cookie(user: &User) -> actix_web::cookie::Cookie<'static> {
    let token = settings()
        .issue_token(user, chrono::Duration::hours(1))
        .expect("issue token");
    actix_web::cookie::Cookie::new(COOKIE, token)
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
