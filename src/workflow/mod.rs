//! Storyboard plans and the multi-clip orchestrator.

mod orchestrator;
mod plan;

pub use orchestrator::{Orchestrator, PollPolicy, WorkflowReport};
pub use plan::{ClipSpec, KeyframeSpec, StoryboardPlan};
