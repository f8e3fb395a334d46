//! Ordered fallback across keyframe generation strategies.
//!
//! The reference-conditioned edit path can fail for reasons the caller
//! cannot predict (model availability, reference rejection). Rather than
//! catching errors ad hoc, callers build an explicit ordered list of
//! generators; the first one to succeed wins.

use crate::error::{ReelError, Result};
use crate::image::generator::KeyframeGenerator;
use crate::image::types::{GeneratedImage, KeyframeRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Tries a list of [`KeyframeGenerator`]s in order, advancing on failure.
pub struct FallbackKeyframer {
    strategies: Vec<Arc<dyn KeyframeGenerator>>,
}

impl FallbackKeyframer {
    /// Creates a fallback chain. The order of `strategies` is the order of
    /// attempts.
    pub fn new(strategies: Vec<Arc<dyn KeyframeGenerator>>) -> Self {
        Self { strategies }
    }

    /// Number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true when the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl KeyframeGenerator for FallbackKeyframer {
    async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
        if self.strategies.is_empty() {
            return Err(ReelError::InvalidRequest(
                "no generation strategies configured".into(),
            ));
        }

        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.generate(request).await {
                Ok(image) => return Ok(image),
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        "keyframe strategy failed, advancing to next: {e}"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.expect("at least one strategy attempted"))
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::{AspectRatio, ImageMetadata};
    use std::sync::atomic::{AtomicU32, Ordering};

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct FixedOutcome {
        succeed: bool,
        calls: AtomicU32,
    }

    impl FixedOutcome {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl KeyframeGenerator for FixedOutcome {
        async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                GeneratedImage::from_bytes(
                    PNG_MAGIC.to_vec(),
                    request.aspect_ratio,
                    ImageMetadata::default(),
                )
            } else {
                Err(ReelError::Api {
                    status: 400,
                    message: "reference rejected".into(),
                })
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = FixedOutcome::new(true);
        let second = FixedOutcome::new(true);
        let chain = FallbackKeyframer::new(vec![first.clone(), second.clone()]);

        let req = KeyframeRequest::new("a desk").with_aspect_ratio(AspectRatio::Landscape);
        chain.generate(&req).await.unwrap();

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_advances_to_next_strategy() {
        let edit = FixedOutcome::new(false);
        let plain = FixedOutcome::new(true);
        let chain = FallbackKeyframer::new(vec![edit.clone(), plain.clone()]);

        let req = KeyframeRequest::new("a desk");
        let image = chain.generate(&req).await.unwrap();
        assert_eq!(image.data, PNG_MAGIC.to_vec());

        assert_eq!(edit.calls.load(Ordering::SeqCst), 1);
        assert_eq!(plain.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failures_surface_last_error() {
        let chain =
            FallbackKeyframer::new(vec![FixedOutcome::new(false), FixedOutcome::new(false)]);
        let err = chain
            .generate(&KeyframeRequest::new("a desk"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_empty_chain_is_invalid() {
        let chain = FallbackKeyframer::new(Vec::new());
        assert!(chain.is_empty());
        let err = chain
            .generate(&KeyframeRequest::new("a desk"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::InvalidRequest(_)));
    }
}
