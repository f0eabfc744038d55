/// HTTP handlers for blog-service
///
/// Read routes answer with the JSON context a page template would receive.
/// Write routes redirect on success; invalid post forms re-render with
/// per-field errors.
pub mod follow;
pub mod health;
pub mod posts;

pub use follow::{follow_index, profile_follow, profile_unfollow};
pub use health::{health, liveness};
pub use posts::{
    add_comment, group_list, index, post_create, post_create_form, post_detail, post_edit,
    post_edit_form, profile,
};

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;

/// `?page=` as sent; resolution happens in the paginator.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// Register every blog route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/group/{slug}/", web::get().to(group_list))
        .route("/profile/{username}/", web::get().to(profile))
        .route("/posts/{post_id}/", web::get().to(post_detail))
        .service(
            web::resource("/create/")
                .route(web::get().to(post_create_form))
                .route(web::post().to(post_create)),
        )
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(post_edit_form))
                .route(web::post().to(post_edit)),
        )
        .route("/posts/{post_id}/comment/", web::post().to(add_comment))
        .route("/follow/", web::get().to(follow_index))
        .route("/profile/{username}/follow/", web::get().to(profile_follow))
        .route("/profile/{username}/unfollow/", web::get().to(profile_unfollow));
}

/// Fallback for unknown routes
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": format!("Not found: {}", req.path()),
        "status": 404,
    }))
}

pub(crate) fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub(crate) fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub(crate) const FOLLOW_INDEX_URL: &str = "/follow/";
