//! Prometheus metrics for blog-service.
//!
//! Exposes index-cache and mutation collectors and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Index cache lookups segmented by outcome (hit/miss/error).
    pub static ref INDEX_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "index_cache_events_total",
        "Index page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register index_cache_events_total");

    /// Times the cached index listing was dropped.
    pub static ref INDEX_CACHE_INVALIDATIONS: IntCounter = register_int_counter!(
        "index_cache_invalidations_total",
        "Index page cache invalidations"
    )
    .expect("failed to register index_cache_invalidations_total");

    /// Applied writes segmented by kind (post_created, post_updated, comment_created, ...).
    pub static ref BLOG_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_mutations_total",
        "Applied blog mutations segmented by kind",
        &["kind"]
    )
    .expect("failed to register blog_mutations_total");
}

pub fn record_mutation(kind: &str) {
    BLOG_MUTATIONS_TOTAL.with_label_values(&[kind]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
