use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::video::Video;

/// Narrow record-store seam: the upload pipeline only ever loads a video
/// and writes it back. No transactional guarantees are assumed; concurrent
/// updates to the same record are last-write-wins.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Video>>;
    async fn update(&self, video: &Video) -> Result<()>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Clone)]
pub struct PgVideoStore {
    db: Db,
}

impl PgVideoStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn get(&self, id: Uuid) -> Result<Option<Video>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, description, thumbnail_url, video_url, created_at \
             FROM videos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        let video = row.map(|row| Video {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            description: row.get("description"),
            thumbnail_url: row.get("thumbnail_url"),
            video_url: row.get("video_url"),
            created_at: row.get("created_at"),
        });

        Ok(video)
    }

    async fn update(&self, video: &Video) -> Result<()> {
        sqlx::query(
            "UPDATE videos \
             SET title = $2, description = $3, thumbnail_url = $4, video_url = $5 \
             WHERE id = $1",
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.db.pool()).await?;
        Ok(())
    }
}
