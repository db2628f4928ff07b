pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::assets::AssetLayout;
use crate::infra::{db::VideoStore, media::MediaTools, storage::ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub videos: Arc<dyn VideoStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub media: Arc<dyn MediaTools>,
    pub assets: AssetLayout,
    pub jwt_secret: String,
}
