/// Follow handlers - subscription feed and follow toggles
use super::{redirect, PageQuery, FOLLOW_INDEX_URL};
use crate::error::Result;
use crate::middleware::LoggedInUser;
use crate::services::FollowOutcome;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// Posts by the authors the caller follows
pub async fn follow_index(
    state: web::Data<AppState>,
    user: LoggedInUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page_obj = state
        .listing
        .list_followed_feed(user.0.id, query.page())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "follow": true,
        "page_obj": page_obj,
    })))
}

pub async fn profile_follow(
    state: web::Data<AppState>,
    user: LoggedInUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let outcome = state.follows.follow(user.0.id, &username).await?;
    if outcome == FollowOutcome::SelfFollow {
        tracing::debug!(user_id = user.0.id, "ignored self-follow");
    }
    Ok(redirect(FOLLOW_INDEX_URL))
}

pub async fn profile_unfollow(
    state: web::Data<AppState>,
    user: LoggedInUser,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    state.follows.unfollow(user.0.id, &username).await?;
    Ok(redirect(FOLLOW_INDEX_URL))
}
