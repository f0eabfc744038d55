use actix_web::{web, App, HttpServer};
use anyhow::Context;
use blog_service::cache::{IndexCache, MemoryPageCache, PageCache, RedisPageCache};
use blog_service::config::{CacheBackend, Config, StorageBackend};
use blog_service::db::{self, BlogStore, MemoryStore, PgStore};
use blog_service::handlers;
use blog_service::middleware::{SessionAuth, SessionSettings};
use blog_service::pagination::Paginator;
use blog_service::AppState;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn BlogStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = db::connect(&config.storage.database_url, config.storage.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            db::MIGRATOR
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Connected to PostgreSQL, migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn build_index_cache(config: &Config) -> anyhow::Result<IndexCache> {
    let backend: Arc<dyn PageCache> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryPageCache::new()),
        CacheBackend::Redis => Arc::new(
            RedisPageCache::connect(&config.cache.redis_url)
                .await
                .context("failed to connect to Redis")?,
        ),
    };

    Ok(IndexCache::new(
        backend,
        Duration::from_secs(config.cache.ttl_secs),
        config.cache.invalidate_on_write,
    ))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = build_store(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)))?;
    let index_cache = build_index_cache(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)))?;

    let state = web::Data::new(AppState::new(
        store,
        index_cache,
        Paginator::new(config.listing.posts_per_page),
    ));
    let session = SessionSettings::from_config(&config.session);
    let session_data = web::Data::new(session.clone());

    let bind_address = config.bind_address();
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(session_data.clone())
            .wrap(SessionAuth::new(session.clone()))
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(blog_service::metrics::serve_metrics))
            .route("/health", web::get().to(handlers::health))
            .route("/health/live", web::get().to(handlers::liveness))
            .configure(handlers::configure)
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
