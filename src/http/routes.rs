use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

use crate::app::uploads::MAX_VIDEO_BYTES;
use crate::http::handlers;
use crate::AppState;

// Headroom for multipart boundaries and part headers around the largest
// accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn videos() -> Router<AppState> {
    Router::new()
        .route("/videos/:id", get(handlers::get_video))
        .route("/videos/:id/thumbnail", post(handlers::upload_thumbnail))
        .route("/videos/:id/video", post(handlers::upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_VIDEO_BYTES + MULTIPART_OVERHEAD))
}
