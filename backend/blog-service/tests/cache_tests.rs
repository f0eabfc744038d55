#[macro_use]
mod common;

use actix_web::test;
use blog_service::cache::{IndexCache, MemoryPageCache, PageCache};
use blog_service::db::BlogStore;
use common::{bearer, Fixture};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn cache_header<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get("X-Page-Cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn index_is_served_from_cache_until_cleared() {
    let backend: Arc<dyn PageCache> = Arc::new(MemoryPageCache::new());
    let f = Fixture::with_cache(IndexCache::new(backend, Duration::from_secs(20), false));
    let author = f.user("auth").await;
    let post = f.post(&author, "Тестовый пост", None).await;
    let app = blog_app!(f.state);

    let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&first), "miss");
    let first_body = test::read_body(first).await;

    f.store.delete_user(author.id).await.unwrap();
    assert!(f.store.find_post(post.id).await.unwrap().is_none());

    let cached = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&cached), "hit");
    assert_eq!(test::read_body(cached).await, first_body);

    f.cache.clear().await;
    let fresh = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&fresh), "miss");
    assert_ne!(test::read_body(fresh).await, first_body);
}

#[actix_web::test]
async fn pages_are_cached_separately() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    f.posts(&author, 13, None).await;
    let app = blog_app!(f.state);

    let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&first), "miss");
    let second = test::call_service(&app, test::TestRequest::get().uri("/?page=2").to_request()).await;
    assert_eq!(cache_header(&second), "miss");

    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["page_obj"]["number"], 2);
}

#[actix_web::test]
async fn new_post_invalidates_cached_index() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    f.post(&author, "old", None).await;
    let app = blog_app!(f.state);

    let warm = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&warm), "miss");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .insert_header(bearer(&author))
            .set_form([("text", "new")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(cache_header(&resp), "miss");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["page_obj"]["object_list"][0]["text"], "new");
    assert_eq!(body["page_obj"]["count"], 2);
}

#[actix_web::test]
async fn junk_page_values_share_one_entry() {
    let backend = Arc::new(MemoryPageCache::new());
    let f = Fixture::with_cache(IndexCache::new(backend.clone(), Duration::from_secs(20), false));
    let author = f.user("auth").await;
    f.post(&author, "Тестовый пост", None).await;
    let app = blog_app!(f.state);

    for i in 0..50 {
        for uri in [format!("/?page=x{}", i), format!("/?page={}", i + 2), "/".to_string()] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
            assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "{}", uri);
        }
    }

    assert_eq!(backend.len(), 1);
}
