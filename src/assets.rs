//! Reference assets: fixed images (logos, screenshots) that steer generation.

use crate::error::Result;
use crate::image::ImageFormat;
use std::path::Path;

/// A static image supplied once per run and attached to generation requests.
#[derive(Debug, Clone)]
pub struct ReferenceAsset {
    /// Display name, taken from the file name.
    pub name: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type, detected from magic bytes with an extension fallback.
    pub mime_type: String,
}

impl ReferenceAsset {
    /// Loads one asset from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        let mime_type = ImageFormat::from_magic_bytes(&data)
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|| match path.extension().and_then(|e| e.to_str()) {
                Some("png") => "image/png".to_string(),
                _ => "image/jpeg".to_string(),
            });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());

        Ok(Self {
            name,
            data,
            mime_type,
        })
    }

    /// Loads a set of assets, skipping paths that do not exist with a
    /// warning rather than failing the run.
    pub fn load_all(paths: &[impl AsRef<Path>]) -> Result<Vec<Self>> {
        let mut assets = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                tracing::warn!(path = %path.display(), "reference asset not found, skipping");
                continue;
            }
            let asset = Self::from_file(path)?;
            tracing::info!(name = %asset.name, bytes = asset.data.len(), "loaded reference asset");
            assets.push(asset);
        }
        Ok(assets)
    }
}
