use tower_http::cors::{Any, CorsLayer};

/// Restrict origins to the configured comma-separated list, or allow any
/// origin when none is configured (or none of the entries parse).
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
