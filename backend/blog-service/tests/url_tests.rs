#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use blog_service::db::BlogStore;
use common::{bearer, location, Fixture};

#[actix_web::test]
async fn public_pages_are_open_to_anonymous_users() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    let group = f.group("test_slug").await;
    let post = f.post(&author, "Тестовый пост", Some(&group)).await;
    let app = blog_app!(f.state);

    for uri in [
        "/".to_string(),
        "/group/test_slug/".to_string(),
        "/profile/auth/".to_string(),
        format!("/posts/{}/", post.id),
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}

#[actix_web::test]
async fn login_required_pages_open_for_logged_in_users() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    let post = f.post(&author, "Тестовый пост", None).await;
    let app = blog_app!(f.state);

    for uri in [
        "/create/".to_string(),
        "/follow/".to_string(),
        format!("/posts/{}/edit/", post.id),
    ] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&author))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}

#[actix_web::test]
async fn anonymous_users_are_sent_to_login_with_next() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    let post = f.post(&author, "Тестовый пост", None).await;
    let app = blog_app!(f.state);

    let cases = [
        (test::TestRequest::get(), "/create/".to_string()),
        (test::TestRequest::post(), "/create/".to_string()),
        (test::TestRequest::get(), format!("/posts/{}/edit/", post.id)),
        (test::TestRequest::post(), format!("/posts/{}/comment/", post.id)),
        (test::TestRequest::get(), "/follow/".to_string()),
        (test::TestRequest::get(), "/profile/auth/follow/".to_string()),
        (test::TestRequest::get(), "/profile/auth/unfollow/".to_string()),
    ];

    for (builder, uri) in cases {
        let resp = test::call_service(&app, builder.uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{}", uri);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", uri));
    }
}

#[actix_web::test]
async fn non_author_edit_redirects_to_detail() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    let other = f.user("not_auth").await;
    let post = f.post(&author, "Тестовый пост", None).await;
    let app = blog_app!(f.state);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(bearer(&other))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
}

#[actix_web::test]
async fn unknown_pages_are_not_found() {
    let f = Fixture::new();
    let app = blog_app!(f.state);

    for uri in [
        "/unexisting_page/",
        "/group/missing/",
        "/profile/ghost/",
        "/posts/999/",
        "/posts/abc/",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
    }
}

#[actix_web::test]
async fn tampered_session_is_treated_as_anonymous() {
    let f = Fixture::new();
    let app = blog_app!(f.state);

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
}

#[actix_web::test]
async fn session_of_deleted_user_is_sent_to_login() {
    let f = Fixture::new();
    let author = f.user("auth").await;
    let ghost = f.user("ghost").await;
    let post = f.post(&author, "Тестовый пост", None).await;
    f.store.delete_user(ghost.id).await.unwrap();
    let app = blog_app!(f.state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .insert_header(bearer(&ghost))
            .set_form([("text", "hello"), ("group", "")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let comment_uri = format!("/posts/{}/comment/", post.id);
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&comment_uri)
            .insert_header(bearer(&ghost))
            .set_form([("text", "hello")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/auth/login/?next={}", comment_uri));

    assert_eq!(f.store.list_comments(post.id).await.unwrap(), vec![]);
    assert_eq!(
        f.store
            .count_posts(blog_service::models::PostFilter::All)
            .await
            .unwrap(),
        1
    );
}

#[actix_web::test]
async fn health_reports_store_status() {
    let f = Fixture::new();
    let app = blog_app!(f.state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
