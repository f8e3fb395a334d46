//! Keyframe generator trait.

use crate::error::Result;
use crate::image::types::{GeneratedImage, KeyframeRequest};
use async_trait::async_trait;

/// Trait for anything that can turn a [`KeyframeRequest`] into an image.
///
/// The workflow orchestrator depends on this seam; the concrete
/// implementations are the Gemini and Imagen clients plus
/// [`FallbackKeyframer`](crate::image::FallbackKeyframer).
#[async_trait]
pub trait KeyframeGenerator: Send + Sync {
    /// Generates an image from the given request.
    async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage>;

    /// Returns a short name for logging.
    fn name(&self) -> &str;
}
