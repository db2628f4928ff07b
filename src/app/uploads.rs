use anyhow::{Context, Result};
use bytes::Bytes;
use std::sync::Arc;
use tempfile::TempDir;

use crate::app::assets::{self, AssetLayout};
use crate::domain::video::Video;
use crate::infra::{db::VideoStore, media::MediaTools, storage::ObjectStore};

pub const MAX_THUMBNAIL_BYTES: usize = 10 << 20;
pub const MAX_VIDEO_BYTES: usize = 1 << 30;

/// Owns the upload pipeline once a request has been authorized and
/// validated: staging, inspection, remuxing, publishing, and the record
/// update. Collaborators come in behind trait seams so the pipeline can be
/// exercised without Postgres, S3, or real media tools.
pub struct UploadService {
    videos: Arc<dyn VideoStore>,
    storage: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaTools>,
    layout: AssetLayout,
}

impl UploadService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        storage: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaTools>,
        layout: AssetLayout,
    ) -> Self {
        Self {
            videos,
            storage,
            media,
            layout,
        }
    }

    /// Write image bytes straight to permanent asset storage and point the
    /// record's thumbnail URL at the locally served file. Images skip the
    /// staging/inspection/remux steps entirely.
    pub async fn save_thumbnail(
        &self,
        video: &mut Video,
        media_type: &str,
        data: Bytes,
    ) -> Result<()> {
        let asset = assets::new_asset_path(media_type);
        let disk_path = self.layout.disk_path(&asset);

        tokio::fs::write(&disk_path, &data)
            .await
            .with_context(|| format!("failed to write asset {}", disk_path.display()))?;

        video.thumbnail_url = Some(self.layout.asset_url(&asset));
        self.videos.update(video).await?;

        tracing::info!(video_id = %video.id, asset = %asset, "thumbnail stored");
        Ok(())
    }

    /// Stage → probe → remux → publish → update record.
    ///
    /// All temporary artifacts live inside a per-request directory whose
    /// guard removes them on every exit path: normal return, any `?` below,
    /// or the request future being dropped mid-flight.
    pub async fn publish_video(
        &self,
        video: &mut Video,
        media_type: &str,
        data: Bytes,
    ) -> Result<()> {
        let asset = assets::new_asset_path(media_type);

        let stage = TempDir::new_in(self.layout.tmp_root())
            .context("failed to create staging directory")?;
        let staged_path = stage.path().join(&asset);

        tokio::fs::write(&staged_path, &data)
            .await
            .with_context(|| format!("failed to stage upload {}", staged_path.display()))?;

        let ratio = self.media.probe_aspect_ratio(&staged_path).await?;
        let remuxed_path = self.media.remux_fast_start(&staged_path).await?;

        let body = tokio::fs::read(&remuxed_path)
            .await
            .with_context(|| format!("failed to read remuxed file {}", remuxed_path.display()))?;

        let key = format!("{}/{}", ratio.as_str(), asset);
        self.storage
            .put_object(&key, Bytes::from(body), media_type)
            .await
            .with_context(|| format!("failed to publish object {}", key))?;

        video.video_url = Some(self.layout.cdn_url(ratio, &asset));
        self.videos.update(video).await?;

        tracing::info!(video_id = %video.id, key = %key, ratio = ratio.as_str(), "video published");
        Ok(())
    }
}
