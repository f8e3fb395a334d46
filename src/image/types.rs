//! Core types for keyframe image generation.

use crate::assets::ReferenceAsset;
use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        None
    }

    /// Resolves a MIME type from raw bytes, using `fallback` when the magic
    /// bytes are not recognized.
    pub fn mime_or(data: &[u8], fallback: &str) -> String {
        Self::from_magic_bytes(data)
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Aspect ratios accepted by the image and video models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 landscape (the ratio the video model expects).
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait.
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3 standard landscape.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the ratio as the API string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Person-generation policy flag forwarded to the image models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PersonGeneration {
    /// Allow generation of adults.
    #[default]
    AllowAdult,
    /// Allow generation of all people.
    AllowAll,
    /// Disallow person generation.
    DontAllow,
}

impl PersonGeneration {
    /// Returns the API string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAdult => "ALLOW_ADULT",
            Self::AllowAll => "ALLOW_ALL",
            Self::DontAllow => "DONT_ALLOW",
        }
    }
}

/// Describes the subject for a reference-conditioned edit. The prompt must
/// address the reference by its `[1]` label for the edit model to use it.
#[derive(Debug, Clone)]
pub struct SubjectDescriptor {
    /// Short description of the subject (e.g., "a person with short dark hair").
    pub description: String,
    /// Subject type accepted by the edit model.
    pub subject_type: SubjectType,
}

/// Subject categories accepted by the edit model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectType {
    /// A person.
    #[default]
    Person,
    /// An animal.
    Animal,
    /// A product.
    Product,
}

impl SubjectType {
    /// Returns the API string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "SUBJECT_TYPE_PERSON",
            Self::Animal => "SUBJECT_TYPE_ANIMAL",
            Self::Product => "SUBJECT_TYPE_PRODUCT",
        }
    }
}

/// A request to generate one keyframe image.
#[derive(Debug, Clone)]
pub struct KeyframeRequest {
    /// The text prompt describing the desired frame.
    pub prompt: String,
    /// Aspect ratio to negotiate with the model.
    pub aspect_ratio: AspectRatio,
    /// Prior keyframe bytes, attached purely for visual continuity.
    pub prior_frame: Option<Vec<u8>>,
    /// Fixed reference assets (logos, screenshots) shared across the run.
    pub reference_assets: Vec<ReferenceAsset>,
    /// Subject descriptor, required by the reference-edit path.
    pub subject: Option<SubjectDescriptor>,
    /// Person policy for the Imagen models.
    pub person_generation: PersonGeneration,
}

impl KeyframeRequest {
    /// Creates a request with the given prompt and default settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            prior_frame: None,
            reference_assets: Vec::new(),
            subject: None,
            person_generation: PersonGeneration::default(),
        }
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Attaches the previous keyframe as a continuity reference.
    pub fn with_prior_frame(mut self, data: Vec<u8>) -> Self {
        self.prior_frame = Some(data);
        self
    }

    /// Attaches fixed reference assets.
    pub fn with_reference_assets(mut self, assets: Vec<ReferenceAsset>) -> Self {
        self.reference_assets = assets;
        self
    }

    /// Sets the subject descriptor for reference-conditioned editing.
    pub fn with_subject(mut self, subject: SubjectDescriptor) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the person-generation policy.
    pub fn with_person_generation(mut self, policy: PersonGeneration) -> Self {
        self.person_generation = policy;
        self
    }

    /// Checks the request before it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ReelError::InvalidRequest("prompt is empty".into()));
        }
        Ok(())
    }
}

/// Metadata about an image generation call.
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated keyframe image.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or passed to the next step"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Aspect ratio negotiated with the model. `None` when the image was
    /// re-loaded from disk and the ratio is unknown.
    pub aspect_ratio: Option<AspectRatio>,
    /// Generation metadata.
    pub metadata: ImageMetadata,
}

impl GeneratedImage {
    /// Creates an image from freshly generated bytes, detecting the format
    /// from magic bytes.
    pub fn from_bytes(
        data: Vec<u8>,
        aspect_ratio: AspectRatio,
        metadata: ImageMetadata,
    ) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data)
            .ok_or_else(|| ReelError::Decode("unknown image format".into()))?;
        Ok(Self {
            data,
            format,
            aspect_ratio: Some(aspect_ratio),
            metadata,
        })
    }

    /// Re-loads a previously saved artifact. The bytes round-trip
    /// byte-identically; the negotiated aspect ratio is not recoverable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();
        Ok(Self {
            data,
            format,
            aspect_ratio: None,
            metadata: ImageMetadata::default(),
        })
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}
