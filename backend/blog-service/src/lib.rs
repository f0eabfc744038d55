/// Blog Service Library
///
/// Yatube: users publish posts, file them under groups, comment on each
/// other's posts and follow the authors they like.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Users, groups, posts, comments and follow edges
/// - `services`: Listing and mutation logic
/// - `db`: Persistence port with PostgreSQL and in-memory stores
/// - `cache`: Rendered index page cache
/// - `forms`: Submitted form cleaning and per-field errors
/// - `pagination`: Page windows over ordered listings
/// - `middleware`: Session resolution and ownership checks
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
