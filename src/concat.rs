//! Clip assembly via the ffmpeg concat demuxer.
//!
//! Clips are stream-copied, never re-encoded, so inputs must share codec
//! parameters. Clips produced by the same model in one run always do.

use crate::error::{ReelError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Name of the manifest written next to the output file.
const MANIFEST_NAME: &str = "clips.txt";

/// Joins video clips into a single file by invoking `ffmpeg`.
pub struct Concatenator {
    tool: String,
}

impl Default for Concatenator {
    fn default() -> Self {
        Self::new()
    }
}

impl Concatenator {
    /// Creates a concatenator that invokes `ffmpeg` from PATH.
    pub fn new() -> Self {
        Self {
            tool: "ffmpeg".to_string(),
        }
    }

    /// Overrides the executable, e.g. an absolute path to a pinned build.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Concatenates `clips` in order into `output`.
    ///
    /// Writes a concat-demuxer manifest next to the output, runs ffmpeg with
    /// stream copy, and removes the manifest on success. On failure the
    /// manifest is left in place for inspection.
    pub async fn concatenate(&self, clips: &[PathBuf], output: &Path) -> Result<PathBuf> {
        if clips.is_empty() {
            return Err(ReelError::InvalidRequest("no clips to concatenate".into()));
        }
        for clip in clips {
            if !clip.exists() {
                return Err(ReelError::Concatenation(format!(
                    "clip not found: {}",
                    clip.display()
                )));
            }
        }

        let manifest_path = output
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(MANIFEST_NAME);
        let manifest = build_manifest(clips)?;
        std::fs::write(&manifest_path, manifest)?;

        tracing::info!(
            clips = clips.len(),
            output = %output.display(),
            "concatenating clips"
        );

        let result = Command::new(&self.tool)
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&manifest_path)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .output()
            .await
            .map_err(|e| ReelError::Concatenation(format!("failed to run {}: {e}", self.tool)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ReelError::Concatenation(format!(
                "{} exited with {}: {}",
                self.tool,
                result.status,
                stderr.trim()
            )));
        }

        // The output exists at this point; a failed manifest cleanup must
        // not fail the step.
        if let Err(e) = std::fs::remove_file(&manifest_path) {
            tracing::warn!(
                manifest = %manifest_path.display(),
                "could not remove manifest: {e}"
            );
        }
        Ok(output.to_path_buf())
    }
}

/// Renders the concat-demuxer manifest. Paths are absolutized so the
/// manifest's own location does not affect resolution.
fn build_manifest(clips: &[PathBuf]) -> Result<String> {
    let mut manifest = String::new();
    for clip in clips {
        let absolute = if clip.is_absolute() {
            clip.clone()
        } else {
            std::env::current_dir()?.join(clip)
        };
        let escaped = absolute.display().to_string().replace('\'', "'\\''");
        manifest.push_str(&format!("file '{escaped}'\n"));
    }
    Ok(manifest)
}
