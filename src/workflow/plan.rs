//! Storyboard plan: the declarative description of a multi-clip run.

use crate::error::{ReelError, Result};
use crate::image::AspectRatio;
use crate::video::ACCEPTED_DURATIONS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn default_duration() -> u32 {
    4
}

fn default_resolution() -> String {
    "720p".to_string()
}

fn default_audio() -> bool {
    true
}

fn default_final_name() -> String {
    "final.mp4".to_string()
}

/// One keyframe in the storyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeSpec {
    /// File-name stem for the persisted image.
    pub name: String,
    /// Scene description.
    pub prompt: String,
}

/// One clip in the storyboard, bounded by consecutive keyframes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSpec {
    /// File-name stem for the persisted clip.
    pub name: String,
    /// Motion and audio-cue description.
    pub prompt: String,
    /// Clip duration in seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
}

/// A full storyboard: N keyframes and the N-1 clips between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryboardPlan {
    /// Keyframes in story order.
    pub keyframes: Vec<KeyframeSpec>,
    /// Clips in story order; clip `i` runs from keyframe `i` to `i + 1`.
    pub clips: Vec<ClipSpec>,
    /// Aspect ratio shared by every keyframe and clip.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Resolution tier for the clips.
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Whether clips carry generated audio.
    #[serde(default = "default_audio")]
    pub generate_audio: bool,
    /// File name of the assembled video.
    #[serde(default = "default_final_name")]
    pub final_name: String,
}

impl StoryboardPlan {
    /// Loads and validates a plan from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReelError::Config(format!("cannot read plan {}: {e}", path.display()))
        })?;
        let plan: Self = serde_json::from_str(&text)
            .map_err(|e| ReelError::Config(format!("invalid plan {}: {e}", path.display())))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Checks structural invariants of the plan.
    pub fn validate(&self) -> Result<()> {
        if self.keyframes.is_empty() {
            return Err(ReelError::InvalidRequest(
                "plan defines no keyframes".into(),
            ));
        }
        if self.clips.len() != self.keyframes.len() - 1 {
            return Err(ReelError::InvalidRequest(format!(
                "{} keyframes require exactly {} clips, plan defines {}",
                self.keyframes.len(),
                self.keyframes.len() - 1,
                self.clips.len()
            )));
        }

        let mut names = HashSet::new();
        for name in self
            .keyframes
            .iter()
            .map(|k| &k.name)
            .chain(self.clips.iter().map(|c| &c.name))
        {
            if name.trim().is_empty() {
                return Err(ReelError::InvalidRequest("empty artifact name".into()));
            }
            if !names.insert(name.as_str()) {
                return Err(ReelError::InvalidRequest(format!(
                    "duplicate artifact name: {name}"
                )));
            }
        }

        for keyframe in &self.keyframes {
            if keyframe.prompt.trim().is_empty() {
                return Err(ReelError::InvalidRequest(format!(
                    "keyframe {} has an empty prompt",
                    keyframe.name
                )));
            }
        }
        for clip in &self.clips {
            if clip.prompt.trim().is_empty() {
                return Err(ReelError::InvalidRequest(format!(
                    "clip {} has an empty prompt",
                    clip.name
                )));
            }
            if !ACCEPTED_DURATIONS.contains(&clip.duration_secs) {
                return Err(ReelError::InvalidRequest(format!(
                    "clip {} duration {}s not in {:?}",
                    clip.name, clip.duration_secs, ACCEPTED_DURATIONS
                )));
            }
        }
        Ok(())
    }
}
