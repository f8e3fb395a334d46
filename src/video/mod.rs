//! Video clip generation.

mod generator;
mod types;
mod veo;

pub use generator::ClipGenerator;
pub use types::{
    ClipMetadata, ClipOperation, ClipOutput, ClipRequest, ClipStatus, FrameRef, GeneratedClip,
    ACCEPTED_DURATIONS,
};
pub use veo::{VeoClient, VeoModel};
