//! Keyframe image generation.

mod gemini;
mod generator;
mod imagen;
mod strategy;
mod types;

pub use gemini::{GeminiImageClient, GeminiImageModel};
pub use generator::KeyframeGenerator;
pub use imagen::{ImagenClient, ImagenModel, ImagenSubjectEdit, ImagenTextToImage};
pub use strategy::FallbackKeyframer;
pub use types::{
    AspectRatio, GeneratedImage, ImageFormat, ImageMetadata, KeyframeRequest, PersonGeneration,
    SubjectDescriptor, SubjectType,
};
