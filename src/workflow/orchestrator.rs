//! The storyboard orchestrator: keyframes, clips, assembly.

use crate::assets::ReferenceAsset;
use crate::concat::Concatenator;
use crate::error::{ReelError, Result};
use crate::image::{GeneratedImage, ImageFormat, KeyframeGenerator, KeyframeRequest};
use crate::video::{ClipGenerator, ClipOutput, ClipRequest, ClipStatus, FrameRef, GeneratedClip};
use crate::workflow::plan::StoryboardPlan;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Cadence and bounds for driving a long-running clip operation.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between status queries.
    pub interval: Duration,
    /// Wall-clock bound on the whole operation.
    pub timeout: Duration,
    /// Optional cap on the number of status queries.
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
            max_polls: None,
        }
    }
}

impl PollPolicy {
    /// Submits `request` and polls until a terminal status.
    ///
    /// A generator that reports pending `k` times before finishing sees
    /// exactly `k + 1` status queries. Exhausting the timeout or the poll
    /// cap raises [`ReelError::Timeout`].
    pub async fn drive(
        &self,
        generator: &dyn ClipGenerator,
        request: &ClipRequest,
    ) -> Result<GeneratedClip> {
        if self.max_polls == Some(0) {
            return Err(ReelError::Config(
                "poll policy allows zero status queries".into(),
            ));
        }

        let operation = generator.submit(request).await?;
        tracing::info!(
            generator = generator.name(),
            operation = %operation.name,
            "clip generation submitted"
        );

        let start = std::time::Instant::now();
        let mut polls: u32 = 0;
        loop {
            tokio::time::sleep(self.interval).await;
            polls += 1;
            tracing::debug!(operation = %operation.name, polls, "polling operation");

            match generator.poll(&operation).await? {
                ClipStatus::Complete(clip) => return Ok(clip),
                ClipStatus::Failed(message) => return Err(ReelError::GenerationFailed(message)),
                ClipStatus::Pending => {}
            }

            if start.elapsed() >= self.timeout {
                return Err(ReelError::Timeout(self.timeout));
            }
            if let Some(cap) = self.max_polls {
                if polls >= cap {
                    return Err(ReelError::Timeout(start.elapsed()));
                }
            }
        }
    }
}

/// Outcome of a storyboard run.
#[derive(Debug)]
pub struct WorkflowReport {
    /// Persisted keyframe image paths, in story order.
    pub keyframes: Vec<PathBuf>,
    /// Locally persisted clip paths, in story order.
    pub clips: Vec<PathBuf>,
    /// Path of the assembled video, when produced.
    pub final_video: Option<PathBuf>,
    expected_clips: usize,
}

impl WorkflowReport {
    /// True when some defined clips were not locally produced, so no final
    /// video exists.
    pub fn partial(&self) -> bool {
        self.clips.len() < self.expected_clips
    }
}

/// Runs a [`StoryboardPlan`] end to end: keyframe chain, bounded clips,
/// final assembly.
pub struct Orchestrator {
    keyframes: Arc<dyn KeyframeGenerator>,
    clips: Arc<dyn ClipGenerator>,
    concat: Concatenator,
    poll: PollPolicy,
    output_dir: PathBuf,
    reuse_existing: bool,
}

impl Orchestrator {
    /// Creates an orchestrator writing artifacts under `output_dir`.
    pub fn new(
        keyframes: Arc<dyn KeyframeGenerator>,
        clips: Arc<dyn ClipGenerator>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            keyframes,
            clips,
            concat: Concatenator::new(),
            poll: PollPolicy::default(),
            output_dir: output_dir.into(),
            reuse_existing: false,
        }
    }

    /// Overrides the poll policy.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Overrides the concatenator.
    pub fn with_concatenator(mut self, concat: Concatenator) -> Self {
        self.concat = concat;
        self
    }

    /// When set, artifacts already on disk are loaded instead of
    /// regenerated, so an interrupted run can resume.
    pub fn with_reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    /// Executes the plan. Step failures propagate; artifacts already
    /// written stay on disk.
    pub async fn run(
        &self,
        plan: &StoryboardPlan,
        assets: &[ReferenceAsset],
    ) -> Result<WorkflowReport> {
        plan.validate()?;
        std::fs::create_dir_all(&self.output_dir)?;

        let (images, keyframe_paths) = self.generate_keyframes(plan, assets).await?;
        let clip_paths = self.generate_clips(plan, &images).await?;

        let final_video = if !plan.clips.is_empty() && clip_paths.len() == plan.clips.len() {
            let output = self.output_dir.join(&plan.final_name);
            Some(self.concat.concatenate(&clip_paths, &output).await?)
        } else {
            if !plan.clips.is_empty() {
                tracing::warn!(
                    produced = clip_paths.len(),
                    defined = plan.clips.len(),
                    "not all clips were produced locally; skipping assembly"
                );
            }
            None
        };

        Ok(WorkflowReport {
            keyframes: keyframe_paths,
            clips: clip_paths,
            final_video,
            expected_clips: plan.clips.len(),
        })
    }

    /// Generates the keyframe chain sequentially. Keyframe `i` carries
    /// keyframe `i - 1` as its only continuity reference.
    async fn generate_keyframes(
        &self,
        plan: &StoryboardPlan,
        assets: &[ReferenceAsset],
    ) -> Result<(Vec<GeneratedImage>, Vec<PathBuf>)> {
        let mut images = Vec::with_capacity(plan.keyframes.len());
        let mut paths = Vec::with_capacity(plan.keyframes.len());

        for (i, spec) in plan.keyframes.iter().enumerate() {
            let existing = self
                .reuse_existing
                .then(|| self.find_keyframe(&spec.name))
                .flatten();

            let (image, path) = match existing {
                Some(path) => {
                    tracing::info!(keyframe = %spec.name, "reusing existing keyframe");
                    (GeneratedImage::load(&path)?, path)
                }
                None => {
                    let mut request = KeyframeRequest::new(&spec.prompt)
                        .with_aspect_ratio(plan.aspect_ratio)
                        .with_reference_assets(assets.to_vec());
                    if i > 0 {
                        let prior: &GeneratedImage = &images[i - 1];
                        request = request.with_prior_frame(prior.data.clone());
                    }

                    tracing::info!(keyframe = %spec.name, index = i, "generating keyframe");
                    let image = self.keyframes.generate(&request).await?;
                    let path = self
                        .output_dir
                        .join(format!("{}.{}", spec.name, image.format.extension()));
                    image.save(&path)?;
                    (image, path)
                }
            };

            images.push(image);
            paths.push(path);
        }
        Ok((images, paths))
    }

    /// Looks for a previously persisted keyframe under any supported
    /// extension.
    fn find_keyframe(&self, name: &str) -> Option<PathBuf> {
        [ImageFormat::Png, ImageFormat::Jpeg]
            .into_iter()
            .map(|format| self.output_dir.join(format!("{name}.{}", format.extension())))
            .find(|path| path.exists())
    }

    /// Generates the clips between consecutive keyframes. Returns the paths
    /// of locally persisted clips; remote outputs are logged and skipped.
    async fn generate_clips(
        &self,
        plan: &StoryboardPlan,
        images: &[GeneratedImage],
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(plan.clips.len());

        for (i, spec) in plan.clips.iter().enumerate() {
            let path = self.output_dir.join(format!("{}.mp4", spec.name));
            if self.reuse_existing && path.exists() {
                tracing::info!(clip = %spec.name, "reusing existing clip");
                paths.push(path);
                continue;
            }

            let request = ClipRequest::new(&spec.prompt)
                .with_first_frame(FrameRef::from_image(&images[i]))
                .with_last_frame(FrameRef::from_image(&images[i + 1]))
                .with_duration(spec.duration_secs)
                .with_aspect_ratio(plan.aspect_ratio)
                .with_resolution(&plan.resolution)
                .with_audio(plan.generate_audio);
            request.validate()?;

            tracing::info!(clip = %spec.name, index = i, "generating clip");
            // An operation that finishes without a video leaves the run
            // partial; service failures and timeouts propagate.
            let clip = match self.poll.drive(self.clips.as_ref(), &request).await {
                Ok(clip) => clip,
                Err(ReelError::EmptyResult(message)) => {
                    tracing::warn!(clip = %spec.name, "no video produced: {message}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match clip.output {
                ClipOutput::Bytes(_) => {
                    clip.save(&path)?;
                    paths.push(path);
                }
                ClipOutput::Remote(ref uri) => {
                    tracing::warn!(clip = %spec.name, uri = %uri, "clip stored remotely, not available for assembly");
                }
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{AspectRatio, ImageMetadata};
    use crate::video::{ClipMetadata, ClipOperation, GeneratedClip};
    use crate::workflow::plan::{ClipSpec, KeyframeSpec};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// Valid PNG prefix with an index byte so frames are distinguishable.
    fn image_bytes(index: u8) -> Vec<u8> {
        let mut data = PNG_MAGIC.to_vec();
        data.push(index);
        data
    }

    struct RecordingKeyframer {
        priors: Mutex<Vec<Option<Vec<u8>>>>,
    }

    impl RecordingKeyframer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                priors: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl KeyframeGenerator for RecordingKeyframer {
        async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
            let mut priors = self.priors.lock().unwrap();
            let index = priors.len() as u8;
            priors.push(request.prior_frame.clone());
            GeneratedImage::from_bytes(
                image_bytes(index),
                request.aspect_ratio,
                ImageMetadata::default(),
            )
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct ScriptedClips {
        pending_per_clip: u32,
        remote: bool,
        submits: AtomicU32,
        polls: AtomicU32,
        pending_left: AtomicU32,
    }

    impl ScriptedClips {
        fn new(pending_per_clip: u32) -> Arc<Self> {
            Arc::new(Self {
                pending_per_clip,
                remote: false,
                submits: AtomicU32::new(0),
                polls: AtomicU32::new(0),
                pending_left: AtomicU32::new(pending_per_clip),
            })
        }

        fn remote(pending_per_clip: u32) -> Arc<Self> {
            Arc::new(Self {
                pending_per_clip,
                remote: true,
                submits: AtomicU32::new(0),
                polls: AtomicU32::new(0),
                pending_left: AtomicU32::new(pending_per_clip),
            })
        }
    }

    #[async_trait]
    impl ClipGenerator for ScriptedClips {
        async fn submit(&self, request: &ClipRequest) -> Result<ClipOperation> {
            request.validate()?;
            let n = self.submits.fetch_add(1, Ordering::SeqCst);
            self.pending_left
                .store(self.pending_per_clip, Ordering::SeqCst);
            Ok(ClipOperation {
                name: format!("operations/{n}"),
            })
        }

        async fn poll(&self, _operation: &ClipOperation) -> Result<ClipStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.pending_left.load(Ordering::SeqCst) > 0 {
                self.pending_left.fetch_sub(1, Ordering::SeqCst);
                return Ok(ClipStatus::Pending);
            }
            let output = if self.remote {
                ClipOutput::Remote("gs://bucket/clip.mp4".into())
            } else {
                ClipOutput::Bytes(vec![0, 0, 0, 1])
            };
            Ok(ClipStatus::Complete(GeneratedClip {
                output,
                mime_type: "video/mp4".into(),
                metadata: ClipMetadata::default(),
            }))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            max_polls: None,
        }
    }

    fn plan(keyframes: usize) -> StoryboardPlan {
        StoryboardPlan {
            keyframes: (0..keyframes)
                .map(|i| KeyframeSpec {
                    name: format!("kf_{i:02}"),
                    prompt: format!("scene {i}"),
                })
                .collect(),
            clips: (0..keyframes.saturating_sub(1))
                .map(|i| ClipSpec {
                    name: format!("clip_{i:02}"),
                    prompt: format!("motion {i}"),
                    duration_secs: 4,
                })
                .collect(),
            aspect_ratio: AspectRatio::Landscape,
            resolution: "720p".into(),
            generate_audio: true,
            final_name: "final.mp4".into(),
        }
    }

    fn orchestrator_with(
        keyframes: Arc<dyn KeyframeGenerator>,
        clips: Arc<ScriptedClips>,
        dir: &std::path::Path,
    ) -> Orchestrator {
        Orchestrator::new(keyframes, clips, dir)
            .with_poll_policy(fast_policy())
            .with_concatenator(Concatenator::new().with_tool("true"))
    }

    #[tokio::test]
    async fn test_keyframe_chaining_uses_previous_frame_only() {
        let dir = tempfile::tempdir().unwrap();
        let keyframer = RecordingKeyframer::new();
        let clips = ScriptedClips::new(0);
        let orch = orchestrator_with(keyframer.clone(), clips, dir.path());

        orch.run(&plan(3), &[]).await.unwrap();

        let priors = keyframer.priors.lock().unwrap();
        assert_eq!(priors.len(), 3);
        assert!(priors[0].is_none());
        assert_eq!(priors[1].as_deref(), Some(image_bytes(0).as_slice()));
        assert_eq!(priors[2].as_deref(), Some(image_bytes(1).as_slice()));
    }

    #[tokio::test]
    async fn test_poll_count_is_pending_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let clips = ScriptedClips::new(3);
        let orch = orchestrator_with(RecordingKeyframer::new(), clips.clone(), dir.path());

        orch.run(&plan(2), &[]).await.unwrap();

        assert_eq!(clips.submits.load(Ordering::SeqCst), 1);
        assert_eq!(clips.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_artifacts_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator_with(RecordingKeyframer::new(), ScriptedClips::new(0), dir.path());

        let report = orch.run(&plan(3), &[]).await.unwrap();

        assert_eq!(report.keyframes.len(), 3);
        assert_eq!(report.clips.len(), 2);
        assert!(!report.partial());
        for path in report.keyframes.iter().chain(report.clips.iter()) {
            assert!(path.exists(), "missing artifact {}", path.display());
        }
    }

    #[tokio::test]
    async fn test_clip_without_video_output_marks_run_partial() {
        struct NoVideoClips {
            submits: AtomicU32,
        }

        #[async_trait]
        impl ClipGenerator for NoVideoClips {
            async fn submit(&self, _request: &ClipRequest) -> Result<ClipOperation> {
                self.submits.fetch_add(1, Ordering::SeqCst);
                Ok(ClipOperation {
                    name: "operations/0".into(),
                })
            }

            async fn poll(&self, _operation: &ClipOperation) -> Result<ClipStatus> {
                Err(ReelError::EmptyResult(
                    "no videos in operation response".into(),
                ))
            }

            fn name(&self) -> &str {
                "no-video"
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let clips = Arc::new(NoVideoClips {
            submits: AtomicU32::new(0),
        });
        let orch = Orchestrator::new(RecordingKeyframer::new(), clips.clone(), dir.path())
            .with_poll_policy(fast_policy())
            .with_concatenator(Concatenator::new().with_tool("true"));

        let report = orch.run(&plan(3), &[]).await.unwrap();

        // Both clips were attempted; neither was produced.
        assert_eq!(clips.submits.load(Ordering::SeqCst), 2);
        assert!(report.clips.is_empty());
        assert!(report.final_video.is_none());
        assert!(report.partial());
    }

    #[tokio::test]
    async fn test_empty_keyframe_result_stops_dependent_steps() {
        struct EmptyKeyframer;

        #[async_trait]
        impl KeyframeGenerator for EmptyKeyframer {
            async fn generate(&self, _request: &KeyframeRequest) -> Result<GeneratedImage> {
                Err(ReelError::EmptyResult("no image data in response".into()))
            }

            fn name(&self) -> &str {
                "empty"
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let clips = ScriptedClips::new(0);
        let orch = orchestrator_with(Arc::new(EmptyKeyframer), clips.clone(), dir.path());

        let err = orch.run(&plan(2), &[]).await.unwrap_err();
        assert!(matches!(err, ReelError::EmptyResult(_)));
        assert_eq!(clips.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keyframe_file_name_follows_image_format() {
        struct JpegKeyframer;

        #[async_trait]
        impl KeyframeGenerator for JpegKeyframer {
            async fn generate(&self, request: &KeyframeRequest) -> Result<GeneratedImage> {
                GeneratedImage::from_bytes(
                    vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0],
                    request.aspect_ratio,
                    ImageMetadata::default(),
                )
            }

            fn name(&self) -> &str {
                "jpeg"
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator_with(Arc::new(JpegKeyframer), ScriptedClips::new(0), dir.path());

        let report = orch.run(&plan(1), &[]).await.unwrap();
        let path = &report.keyframes[0];
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_remote_clips_skip_assembly_and_mark_partial() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator_with(
            RecordingKeyframer::new(),
            ScriptedClips::remote(0),
            dir.path(),
        );

        let report = orch.run(&plan(2), &[]).await.unwrap();

        assert!(report.clips.is_empty());
        assert!(report.final_video.is_none());
        assert!(report.partial());
    }

    #[tokio::test]
    async fn test_single_keyframe_plan_produces_no_final_video() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator_with(RecordingKeyframer::new(), ScriptedClips::new(0), dir.path());

        let report = orch.run(&plan(1), &[]).await.unwrap();

        assert_eq!(report.keyframes.len(), 1);
        assert!(report.final_video.is_none());
        assert!(!report.partial());
    }

    #[tokio::test]
    async fn test_reuse_existing_skips_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let first = RecordingKeyframer::new();
        let orch = orchestrator_with(first.clone(), ScriptedClips::new(0), dir.path());
        orch.run(&plan(2), &[]).await.unwrap();

        let second = RecordingKeyframer::new();
        let clips = ScriptedClips::new(0);
        let orch = orchestrator_with(second.clone(), clips.clone(), dir.path())
            .with_reuse_existing(true);
        let report = orch.run(&plan(2), &[]).await.unwrap();

        assert!(second.priors.lock().unwrap().is_empty());
        assert_eq!(clips.submits.load(Ordering::SeqCst), 0);
        assert!(!report.partial());
    }

    #[tokio::test]
    async fn test_poll_cap_escalates_to_timeout() {
        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(60),
            max_polls: Some(2),
        };
        let clips = ScriptedClips::new(10);
        let request = ClipRequest::new("motion");

        let err = policy.drive(clips.as_ref(), &request).await.unwrap_err();
        assert!(matches!(err, ReelError::Timeout(_)));
        assert_eq!(clips.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wall_clock_timeout() {
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(1),
            max_polls: None,
        };
        let clips = ScriptedClips::new(u32::MAX);
        let err = policy
            .drive(clips.as_ref(), &ClipRequest::new("motion"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_zero_poll_cap_is_a_config_error() {
        let policy = PollPolicy {
            max_polls: Some(0),
            ..fast_policy()
        };
        let clips = ScriptedClips::new(0);
        let err = policy
            .drive(clips.as_ref(), &ClipRequest::new("motion"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Config(_)));
        assert_eq!(clips.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_operation_surfaces_service_message() {
        struct FailingClips;

        #[async_trait]
        impl ClipGenerator for FailingClips {
            async fn submit(&self, _request: &ClipRequest) -> Result<ClipOperation> {
                Ok(ClipOperation {
                    name: "operations/0".into(),
                })
            }

            async fn poll(&self, _operation: &ClipOperation) -> Result<ClipStatus> {
                Ok(ClipStatus::Failed("prompt violates policy".into()))
            }

            fn name(&self) -> &str {
                "failing"
            }
        }

        let err = fast_policy()
            .drive(&FailingClips, &ClipRequest::new("motion"))
            .await
            .unwrap_err();
        match err {
            ReelError::GenerationFailed(message) => {
                assert_eq!(message, "prompt violates policy")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
