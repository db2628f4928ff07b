use axum::Router;
use tower_http::services::ServeDir;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{issue_token, validate_token, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let serve_assets = ServeDir::new(state.assets.assets_root.clone());

    Router::new()
        .merge(routes::health())
        .merge(routes::videos())
        .nest_service("/assets", serve_assets)
        .with_state(state)
}
