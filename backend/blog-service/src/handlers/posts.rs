/// Post handlers - listings, post detail, post forms and comments
use super::{post_url, profile_url, redirect, PageQuery};
use crate::cache::IndexCache;
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::middleware::{CurrentUser, LoggedInUser};
use crate::models::{Group, Post};
use crate::services::PostDetail;
use crate::state::AppState;
use actix_web::{http::header::ContentType, web, HttpResponse};
use serde::Serialize;

pub const PAGE_CACHE_HEADER: &str = "X-Page-Cache";

/// A form as a template sees it: the submitted values plus per-field errors.
#[derive(Debug, Serialize)]
pub struct FormContext<T: Serialize> {
    pub data: T,
    pub errors: FormErrors,
}

impl<T: Serialize> FormContext<T> {
    pub fn unbound(data: T) -> Self {
        Self {
            data,
            errors: FormErrors::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PostDetailContext {
    #[serde(flatten)]
    detail: PostDetail,
    form: FormContext<CommentForm>,
}

#[derive(Debug, Serialize)]
struct PostFormContext {
    form: FormContext<PostForm>,
    groups: Vec<Group>,
    is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_can_edit: Option<bool>,
}

/// All posts, newest first. Rendered pages are cached per resolved page number.
pub async fn index(state: web::Data<AppState>, query: web::Query<PageQuery>) -> Result<HttpResponse> {
    let generation = state.index_cache.generation();
    let (window, count) = state.listing.resolve_all(query.page()).await?;
    let key = IndexCache::key_for(window.number);

    if let Some(body) = state.index_cache.get(&key).await {
        return Ok(HttpResponse::Ok()
            .content_type(ContentType::json())
            .insert_header((PAGE_CACHE_HEADER, "hit"))
            .body(body));
    }

    let page_obj = state.listing.list_all_window(window, count).await?;
    let body = serde_json::to_vec(&serde_json::json!({
        "index": true,
        "page_obj": page_obj,
    }))?;
    state.index_cache.put(&key, body.clone(), generation).await;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .insert_header((PAGE_CACHE_HEADER, "miss"))
        .body(body))
}

pub async fn group_list(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let context = state.listing.list_by_group(&slug, query.page()).await?;
    Ok(HttpResponse::Ok().json(context))
}

pub async fn profile(
    state: web::Data<AppState>,
    viewer: Option<CurrentUser>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let context = state
        .listing
        .list_by_author(&username, query.page(), viewer.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(context))
}

pub async fn post_detail(
    state: web::Data<AppState>,
    viewer: Option<CurrentUser>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = state
        .listing
        .post_detail(post_id.into_inner(), viewer.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(PostDetailContext {
        detail,
        form: FormContext::unbound(CommentForm::default()),
    }))
}

pub async fn post_create_form(
    state: web::Data<AppState>,
    _user: LoggedInUser,
) -> Result<HttpResponse> {
    render_post_form(&state, FormContext::unbound(PostForm::default()), None).await
}

pub async fn post_create(
    state: web::Data<AppState>,
    user: LoggedInUser,
    form: web::Form<PostForm>,
) -> Result<HttpResponse> {
    let LoggedInUser(user) = user;
    let form = form.into_inner();

    match state.posts.create_post(user.id, &form).await {
        Ok(_) => Ok(redirect(profile_url(&user.username))),
        Err(AppError::Validation(errors)) => {
            render_post_form(&state, FormContext { data: form, errors }, None).await
        }
        Err(err) => Err(err),
    }
}

/// Edit form for the author; anyone else is sent back to the post.
pub async fn post_edit_form(
    state: web::Data<AppState>,
    user: LoggedInUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post = state
        .posts
        .editable_post(post_id.into_inner(), user.0.id)
        .await?;
    let post_id = post.id;
    render_post_form(&state, FormContext::unbound(initial_form(post)), Some(post_id)).await
}

pub async fn post_edit(
    state: web::Data<AppState>,
    user: LoggedInUser,
    post_id: web::Path<i64>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let form = form.into_inner();

    match state.posts.update_post(post_id, user.0.id, &form).await {
        Ok(post) => Ok(redirect(post_url(post.id))),
        Err(AppError::Validation(errors)) => {
            render_post_form(&state, FormContext { data: form, errors }, Some(post_id)).await
        }
        Err(err) => Err(err),
    }
}

/// Invalid comments are dropped; either way the caller lands on the post.
pub async fn add_comment(
    state: web::Data<AppState>,
    user: LoggedInUser,
    post_id: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();

    match state.comments.add_comment(post_id, user.0.id, &form).await {
        Ok(_) => {}
        Err(AppError::Validation(errors)) => {
            tracing::debug!(post_id, %errors, "comment rejected");
        }
        Err(err) => return Err(err),
    }
    Ok(redirect(post_url(post_id)))
}

fn initial_form(post: Post) -> PostForm {
    PostForm {
        text: post.text,
        group: post.group.map(|g| g.id.to_string()),
        image: post.image,
        image_clear: None,
    }
}

async fn render_post_form(
    state: &AppState,
    form: FormContext<PostForm>,
    post_id: Option<i64>,
) -> Result<HttpResponse> {
    let groups = state.listing.list_groups().await?;
    Ok(HttpResponse::Ok().json(PostFormContext {
        form,
        groups,
        is_edit: post_id.is_some(),
        post_id,
        user_can_edit: post_id.map(|_| true),
    }))
}
