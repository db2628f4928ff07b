use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vireo::app::assets::AssetLayout;
use vireo::config::AppConfig;
use vireo::infra::db::{Db, PgVideoStore};
use vireo::infra::media::FfmpegTools;
use vireo::infra::storage::S3Storage;
use vireo::{http, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let assets = AssetLayout::new(
        config.assets_root.clone(),
        config.public_base_url.clone(),
        config.cdn_host.clone(),
    );
    assets.ensure_dirs()?;

    let db = Db::connect(&config).await?;
    let storage = S3Storage::new(&config).await?;
    let media = FfmpegTools::new(
        config.ffprobe_path.clone(),
        config.ffmpeg_path.clone(),
        Duration::from_secs(config.media_tool_timeout_seconds),
    );

    let state = AppState {
        videos: Arc::new(PgVideoStore::new(db)),
        storage: Arc::new(storage),
        media: Arc::new(media),
        assets,
        jwt_secret: config.jwt_secret.clone(),
    };

    let app: Router = http::router(state).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
