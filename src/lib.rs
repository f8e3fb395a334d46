#![warn(missing_docs)]
//! StoryReel - multi-clip marketing video generation on Vertex AI.
//!
//! Builds a chain of continuity-linked keyframe images, generates a video
//! clip between each consecutive pair, and assembles the clips into one
//! final video with ffmpeg.
//!
//! # Quick Start - Single Keyframe
//!
//! ```no_run
//! use storyreel::{ClientFactory, KeyframeGenerator, KeyframeRequest, VertexConfig};
//!
//! #[tokio::main]
//! async fn main() -> storyreel::Result<()> {
//!     let factory = ClientFactory::new(VertexConfig::from_env()?)?;
//!     let gemini = factory.gemini_client();
//!     let request = KeyframeRequest::new("A developer at a desk, morning light");
//!     let image = gemini.generate(&request).await?;
//!     image.save("keyframe.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Full Storyboard
//!
//! ```no_run
//! use std::sync::Arc;
//! use storyreel::{ClientFactory, Orchestrator, StoryboardPlan, VertexConfig};
//!
//! #[tokio::main]
//! async fn main() -> storyreel::Result<()> {
//!     let factory = ClientFactory::new(VertexConfig::from_env()?)?;
//!     let plan = StoryboardPlan::from_json_file("plan.json")?;
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(factory.gemini_client()),
//!         Arc::new(factory.veo_client()),
//!         "out",
//!     );
//!     let report = orchestrator.run(&plan, &[]).await?;
//!     println!("final video: {:?}", report.final_video);
//!     Ok(())
//! }
//! ```

mod assets;
mod auth;
mod concat;
mod config;
mod error;

pub mod image;
pub mod video;
pub mod workflow;

pub use assets::ReferenceAsset;
pub use auth::{ServiceAccountKey, TokenProvider};
pub use concat::Concatenator;
pub use config::{ClientFactory, VertexConfig, CREDENTIALS_VAR, PROJECT_ID_VAR};
pub use error::{ReelError, Result};

pub use image::{
    AspectRatio, FallbackKeyframer, GeminiImageClient, GeneratedImage, ImagenClient,
    ImagenSubjectEdit, ImagenTextToImage, KeyframeGenerator, KeyframeRequest,
};
pub use video::{ClipGenerator, ClipRequest, FrameRef, GeneratedClip, VeoClient};
pub use workflow::{Orchestrator, PollPolicy, StoryboardPlan, WorkflowReport};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ReelError, Result};

    pub use crate::config::{ClientFactory, VertexConfig};
    pub use crate::image::{GeneratedImage, KeyframeGenerator, KeyframeRequest};
    pub use crate::video::{ClipGenerator, ClipRequest, GeneratedClip};
    pub use crate::workflow::{Orchestrator, StoryboardPlan};
}
