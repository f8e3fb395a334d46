//! Core types for video clip generation.

use crate::error::{ReelError, Result};
use crate::image::{AspectRatio, GeneratedImage, ImageFormat};
use std::path::Path;

/// Durations (seconds) the video model accepts.
pub const ACCEPTED_DURATIONS: [u32; 3] = [4, 6, 8];

/// A still frame used to bound a clip.
#[derive(Debug, Clone)]
pub struct FrameRef {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// MIME type of the frame.
    pub mime_type: String,
    /// Negotiated aspect ratio, when known.
    pub aspect_ratio: Option<AspectRatio>,
}

impl FrameRef {
    /// Builds a frame reference from a generated keyframe.
    pub fn from_image(image: &GeneratedImage) -> Self {
        Self {
            data: image.data.clone(),
            mime_type: image.format.mime_type().to_string(),
            aspect_ratio: image.aspect_ratio,
        }
    }

    /// Builds a frame reference from an image file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = ImageFormat::mime_or(&data, "image/png");
        Ok(Self {
            data,
            mime_type,
            aspect_ratio: None,
        })
    }
}

/// A request to generate one video clip.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// Motion/audio-cue prompt.
    pub prompt: String,
    /// First frame of the clip.
    pub first_frame: Option<FrameRef>,
    /// Last frame of the clip.
    pub last_frame: Option<FrameRef>,
    /// Clip duration in whole seconds; must be in [`ACCEPTED_DURATIONS`].
    pub duration_secs: u32,
    /// Aspect ratio forwarded to the model.
    pub aspect_ratio: AspectRatio,
    /// Resolution tier (e.g., "720p").
    pub resolution: String,
    /// Whether the model should generate an audio track.
    pub generate_audio: bool,
    /// Optional remote-storage prefix for the output. When set, the service
    /// returns a storage pointer instead of inline bytes.
    pub storage_uri: Option<String>,
}

impl ClipRequest {
    /// Creates a request with the given prompt and default settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            first_frame: None,
            last_frame: None,
            duration_secs: 4,
            aspect_ratio: AspectRatio::Landscape,
            resolution: "720p".to_string(),
            generate_audio: true,
            storage_uri: None,
        }
    }

    /// Sets the first frame.
    pub fn with_first_frame(mut self, frame: FrameRef) -> Self {
        self.first_frame = Some(frame);
        self
    }

    /// Sets the last frame.
    pub fn with_last_frame(mut self, frame: FrameRef) -> Self {
        self.last_frame = Some(frame);
        self
    }

    /// Sets the duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Sets the resolution tier.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Toggles audio generation.
    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.generate_audio = enabled;
        self
    }

    /// Sets a remote-storage prefix for the output.
    pub fn with_storage_uri(mut self, uri: impl Into<String>) -> Self {
        self.storage_uri = Some(uri.into());
        self
    }

    /// Checks the request before submission.
    ///
    /// Mismatched first/last aspect ratios are rejected here rather than
    /// forwarded: the service accepts them but output quality degrades, so a
    /// mismatch is treated as a caller bug.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ReelError::InvalidRequest("prompt is empty".into()));
        }
        if !ACCEPTED_DURATIONS.contains(&self.duration_secs) {
            return Err(ReelError::InvalidRequest(format!(
                "duration {}s not accepted; must be one of {:?}",
                self.duration_secs, ACCEPTED_DURATIONS
            )));
        }
        if let (Some(first), Some(last)) = (&self.first_frame, &self.last_frame) {
            if let (Some(a), Some(b)) = (first.aspect_ratio, last.aspect_ratio) {
                if a != b {
                    return Err(ReelError::InvalidRequest(format!(
                        "first frame is {a} but last frame is {b}; bounding frames must share an aspect ratio"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Where a generated clip's bytes live.
#[derive(Debug, Clone)]
pub enum ClipOutput {
    /// Inline bytes returned by the service.
    Bytes(Vec<u8>),
    /// Opaque pointer to remotely stored content (e.g., a `gs://` URI).
    Remote(String),
}

/// Metadata about a clip generation call.
#[derive(Debug, Clone, Default)]
pub struct ClipMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Requested clip duration in seconds.
    pub duration_secs: Option<u32>,
    /// Resolution tier.
    pub resolution: Option<String>,
}

/// A generated video clip.
#[derive(Debug, Clone)]
#[must_use = "generated clip should be saved or passed to assembly"]
pub struct GeneratedClip {
    /// Clip content: inline bytes or a remote pointer.
    pub output: ClipOutput,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: ClipMetadata,
}

impl GeneratedClip {
    /// Saves inline bytes to `path`. Returns `InvalidRequest` when the clip
    /// only exists remotely.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        match &self.output {
            ClipOutput::Bytes(data) => {
                std::fs::write(path, data)?;
                Ok(())
            }
            ClipOutput::Remote(uri) => Err(ReelError::InvalidRequest(format!(
                "clip is stored remotely at {uri}; download it before saving"
            ))),
        }
    }

    /// Size of inline bytes, or 0 for a remote clip.
    pub fn size(&self) -> usize {
        match &self.output {
            ClipOutput::Bytes(data) => data.len(),
            ClipOutput::Remote(_) => 0,
        }
    }
}

/// Handle for a submitted long-running generation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOperation {
    /// Fully qualified operation name returned by the service.
    pub name: String,
}

/// Status of a polled operation.
#[derive(Debug, Clone)]
pub enum ClipStatus {
    /// The operation has not finished.
    Pending,
    /// The operation finished and produced a clip.
    Complete(GeneratedClip),
    /// The operation finished with a service-reported failure payload.
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageMetadata;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn frame(ratio: Option<AspectRatio>) -> FrameRef {
        FrameRef {
            data: PNG_MAGIC.to_vec(),
            mime_type: "image/png".into(),
            aspect_ratio: ratio,
        }
    }

    #[test]
    fn test_validate_duration_set() {
        assert!(ClipRequest::new("walk").with_duration(4).validate().is_ok());
        assert!(ClipRequest::new("walk").with_duration(6).validate().is_ok());
        assert!(ClipRequest::new("walk").with_duration(8).validate().is_ok());

        let err = ClipRequest::new("walk")
            .with_duration(5)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ReelError::InvalidRequest(_)));
    }

    #[test]
    fn test_validate_rejects_mismatched_frame_ratios() {
        let req = ClipRequest::new("walk")
            .with_first_frame(frame(Some(AspectRatio::Landscape)))
            .with_last_frame(frame(Some(AspectRatio::Portrait)));
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("aspect ratio"));
    }

    #[test]
    fn test_validate_allows_unknown_frame_ratios() {
        // Frames re-loaded from disk carry no negotiated ratio.
        let req = ClipRequest::new("walk")
            .with_first_frame(frame(Some(AspectRatio::Landscape)))
            .with_last_frame(frame(None));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_frame_ref_from_image_carries_ratio() {
        let image = GeneratedImage::from_bytes(
            PNG_MAGIC.to_vec(),
            AspectRatio::Landscape,
            ImageMetadata::default(),
        )
        .unwrap();
        let frame = FrameRef::from_image(&image);
        assert_eq!(frame.aspect_ratio, Some(AspectRatio::Landscape));
        assert_eq!(frame.mime_type, "image/png");
    }

    #[test]
    fn test_clip_save_rejects_remote_output() {
        let clip = GeneratedClip {
            output: ClipOutput::Remote("gs://bucket/clip.mp4".into()),
            mime_type: "video/mp4".into(),
            metadata: ClipMetadata::default(),
        };
        let err = clip.save("/tmp/never-written.mp4").unwrap_err();
        assert!(matches!(err, ReelError::InvalidRequest(_)));
        assert_eq!(clip.size(), 0);
    }

    #[test]
    fn test_clip_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let clip = GeneratedClip {
            output: ClipOutput::Bytes(vec![1, 2, 3]),
            mime_type: "video/mp4".into(),
            metadata: ClipMetadata::default(),
        };
        clip.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}
