/// HTTP middleware utilities for blog-service
///
/// Sessions are issued by the auth frontend; this service only reads them.
/// `SessionAuth` resolves the session token on every request into an optional
/// `CurrentUser` extension, and `LoggedInUser` turns a missing session into the
/// login redirect for routes that require one.
pub mod permissions;

pub use permissions::*;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{error::ErrorUnauthorized, http::header, web, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";

// =====================================================================
// Session tokens
// =====================================================================

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Mint an HS256 session token for `user`, valid for `ttl`.
pub fn issue_session_token(
    secret: &str,
    user: &User,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: (chrono::Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// How sessions are read and where anonymous callers are sent.
#[derive(Clone)]
pub struct SessionSettings {
    secret: String,
    pub cookie_name: String,
    pub login_url: String,
}

impl SessionSettings {
    pub fn new(
        secret: impl Into<String>,
        cookie_name: impl Into<String>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
            login_url: login_url.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret, &config.cookie_name, &config.login_url)
    }

    pub fn issue_token(
        &self,
        user: &User,
        ttl: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        issue_session_token(&self.secret, user, ttl)
    }

    /// Decode a token; anything invalid or expired yields `None`.
    pub fn verify(&self, token: &str) -> Option<CurrentUser> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| debug!("rejected session token: {}", err))
        .ok()?;

        let id = data.claims.sub.parse().ok()?;
        Some(CurrentUser {
            id,
            username: data.claims.username,
        })
    }

    /// Login URL carrying `next` so the user returns to `path` afterwards.
    pub fn login_redirect(&self, path: &str) -> String {
        login_redirect(&self.login_url, path)
    }
}

fn login_redirect(login_url: &str, path: &str) -> String {
    let next = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}?next={}", login_url, next)
}

// =====================================================================
// Session middleware
// =====================================================================

/// Identity of the caller, resolved from the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Actix middleware that resolves the session cookie or Bearer token.
///
/// Never rejects a request: a missing or bad token just leaves the caller anonymous.
pub struct SessionAuth {
    settings: Arc<SessionSettings>,
}

impl SessionAuth {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthService {
            service: Rc::new(service),
            settings: self.settings.clone(),
        }))
    }
}

pub struct SessionAuthService<S> {
    service: Rc<S>,
    settings: Arc<SessionSettings>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let settings = self.settings.clone();

        Box::pin(async move {
            let bearer = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string);
            let token = bearer.or_else(|| {
                req.cookie(&settings.cookie_name)
                    .map(|cookie| cookie.value().to_string())
            });

            if let Some(user) = token.as_deref().and_then(|t| settings.verify(t)) {
                req.extensions_mut().insert(user);
            }

            service.call(req).await
        })
    }
}

/// `Option<CurrentUser>` is the extractor for routes open to anonymous callers.
impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("No session")),
        )
    }
}

/// Extractor for login-required routes; anonymous callers get the login redirect.
///
/// A session whose user has since been deleted counts as anonymous.
#[derive(Debug, Clone)]
pub struct LoggedInUser(pub CurrentUser);

impl FromRequest for LoggedInUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let session = req.extensions().get::<CurrentUser>().cloned();
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let location = login_location(req);

        Box::pin(async move {
            let Some(user) = session else {
                return Err(AppError::Unauthenticated { location });
            };
            let Some(state) = state else {
                return Ok(LoggedInUser(user));
            };

            match state.store.find_user(user.id).await? {
                Some(_) => Ok(LoggedInUser(user)),
                None => {
                    debug!(user_id = user.id, "session refers to a deleted user");
                    Err(AppError::Unauthenticated { location })
                }
            }
        })
    }
}

fn login_location(req: &HttpRequest) -> String {
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.path());
    match req.app_data::<web::Data<SessionSettings>>() {
        Some(settings) => settings.login_redirect(path),
        None => login_redirect(DEFAULT_LOGIN_URL, path),
    }
}
