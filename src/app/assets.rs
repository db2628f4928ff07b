use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::path::PathBuf;

use crate::infra::media::AspectRatio;

/// Generate a new asset name: 32 bytes from the OS CSPRNG encoded as
/// URL-safe base64, plus an extension derived from the media type.
pub fn new_asset_path(media_type: &str) -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let id = URL_SAFE_NO_PAD.encode(raw);
    format!("{}{}", id, file_extension(media_type))
}

/// Malformed media types (not exactly `type/subtype`) fall back to a
/// generic binary extension instead of failing.
pub fn file_extension(media_type: &str) -> String {
    let parts: Vec<&str> = media_type.split('/').collect();
    if parts.len() != 2 {
        return ".bin".to_string();
    }
    format!(".{}", parts[1])
}

/// Path and URL derivation for stored assets. All methods are pure; the
/// only filesystem access is the one-time `ensure_dirs` at startup.
#[derive(Clone, Debug)]
pub struct AssetLayout {
    pub assets_root: PathBuf,
    pub public_base_url: String,
    pub cdn_host: String,
}

impl AssetLayout {
    pub fn new(
        assets_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        cdn_host: impl Into<String>,
    ) -> Self {
        Self {
            assets_root: assets_root.into(),
            public_base_url: public_base_url.into(),
            cdn_host: cdn_host.into(),
        }
    }

    pub fn disk_path(&self, asset: &str) -> PathBuf {
        self.assets_root.join(asset)
    }

    pub fn tmp_root(&self) -> PathBuf {
        self.assets_root.join("tmp")
    }

    pub fn asset_url(&self, asset: &str) -> String {
        format!("{}/assets/{}", self.public_base_url, asset)
    }

    pub fn cdn_url(&self, ratio: AspectRatio, asset: &str) -> String {
        format!("https://{}/{}/{}", self.cdn_host, ratio.as_str(), asset)
    }

    /// Idempotent. Called once at startup, never on the upload path.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.assets_root)?;
        std::fs::create_dir_all(self.tmp_root())
    }
}
