use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

use firenews_core::FireNews;

use crate::rest;

pub struct AppState {
    pub deps: FireNews,
}

pub fn build_router(deps: FireNews, allowed_origin: &str) -> Router {
    let state = Arc::new(AppState { deps });

    let cors = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            warn!(allowed_origin, "Invalid ALLOWED_ORIGIN, allowing any origin");
            CorsLayer::new().allow_origin(Any)
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = Router::new()
        .route("/partner/submit", post(rest::articles::api_submit))
        .route("/articles", get(rest::articles::api_articles))
        .route("/articles/{id}", get(rest::articles::api_article_detail))
        .route("/articles/{id}/report", post(rest::moderator::api_report))
        .route("/articles/{id}/notes", get(rest::moderator::api_notes))
        .route("/moderator/queue", get(rest::moderator::api_queue))
        .route("/moderator/override", post(rest::moderator::api_override))
        .route("/health", get(|| async { "ok" }));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
