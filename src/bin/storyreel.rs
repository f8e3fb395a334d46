//! StoryReel command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use storyreel::{
    AspectRatio, ClientFactory, Concatenator, FallbackKeyframer, FrameRef, GeneratedImage,
    ImagenSubjectEdit, ImagenTextToImage, KeyframeGenerator, KeyframeRequest, Orchestrator,
    PollPolicy, ReferenceAsset, StoryboardPlan, VertexConfig,
};
use storyreel::image::{SubjectDescriptor, SubjectType};
use storyreel::video::ClipRequest;

#[derive(Parser)]
#[command(name = "storyreel", about = "Generate multi-clip marketing videos on Vertex AI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Engine {
    /// Gemini image model (reference composition).
    Gemini,
    /// Imagen models (text-to-image, subject edit with --subject).
    Imagen,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ratio {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<Ratio> for AspectRatio {
    fn from(ratio: Ratio) -> Self {
        match ratio {
            Ratio::Square => AspectRatio::Square,
            Ratio::Landscape => AspectRatio::Landscape,
            Ratio::Portrait => AspectRatio::Portrait,
            Ratio::Standard => AspectRatio::Standard,
            Ratio::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate a single keyframe image.
    Keyframe {
        /// Scene description.
        prompt: String,
        /// Output image path.
        #[arg(short, long, default_value = "keyframe.png")]
        output: PathBuf,
        /// Aspect ratio.
        #[arg(long, value_enum, default_value = "16:9")]
        aspect_ratio: Ratio,
        /// Prior keyframe used as a continuity reference.
        #[arg(long)]
        prior: Option<PathBuf>,
        /// Reference asset images (logos, screenshots).
        #[arg(long)]
        asset: Vec<PathBuf>,
        /// Generation engine.
        #[arg(long, value_enum, default_value = "gemini")]
        engine: Engine,
        /// Subject description for the Imagen edit path; address it as
        /// "[1]" in the prompt. Falls back to plain generation on failure.
        #[arg(long)]
        subject: Option<String>,
    },
    /// Generate a single clip bounded by two frames.
    Clip {
        /// Motion and audio-cue description.
        prompt: String,
        /// First-frame image.
        #[arg(long)]
        first: PathBuf,
        /// Last-frame image.
        #[arg(long)]
        last: Option<PathBuf>,
        /// Output clip path.
        #[arg(short, long, default_value = "clip.mp4")]
        output: PathBuf,
        /// Duration in seconds (4, 6 or 8).
        #[arg(long, default_value_t = 4)]
        duration: u32,
        /// Resolution tier.
        #[arg(long, default_value = "720p")]
        resolution: String,
        /// Disable generated audio.
        #[arg(long)]
        no_audio: bool,
    },
    /// Run a full storyboard plan: keyframes, clips, assembly.
    Storyboard {
        /// JSON plan file (see demos/developer_discovery.json for the shape).
        plan: PathBuf,
        /// Directory for all run artifacts.
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
        /// Reference asset images attached to every keyframe.
        #[arg(long)]
        asset: Vec<PathBuf>,
        /// Reuse artifacts already present in the output directory.
        #[arg(long)]
        reuse: bool,
        /// Seconds between status polls.
        #[arg(long, default_value_t = 10)]
        poll_interval: u64,
        /// Per-clip timeout in seconds.
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// Concatenate existing clips into one video.
    Concat {
        /// Clip files in order.
        clips: Vec<PathBuf>,
        /// Output video path.
        #[arg(short, long, default_value = "final.mp4")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Keyframe {
            prompt,
            output,
            aspect_ratio,
            prior,
            asset,
            engine,
            subject,
        } => {
            let factory = factory()?;
            let assets = ReferenceAsset::load_all(&asset)?;

            let mut request = KeyframeRequest::new(prompt)
                .with_aspect_ratio(aspect_ratio.into())
                .with_reference_assets(assets);
            if let Some(ref path) = prior {
                let image = GeneratedImage::load(path)
                    .with_context(|| format!("loading prior frame {}", path.display()))?;
                request = request.with_prior_frame(image.data);
            }
            if let Some(description) = subject {
                request = request.with_subject(SubjectDescriptor {
                    description,
                    subject_type: SubjectType::Person,
                });
            }

            let generator = keyframer(&factory, engine, request.subject.is_some());
            let image = generator.generate(&request).await?;
            image.save(&output)?;
            println!("wrote {} ({} bytes)", output.display(), image.size());
        }

        Command::Clip {
            prompt,
            first,
            last,
            output,
            duration,
            resolution,
            no_audio,
        } => {
            let factory = factory()?;
            let mut request = ClipRequest::new(prompt)
                .with_first_frame(FrameRef::from_file(&first)?)
                .with_duration(duration)
                .with_resolution(resolution)
                .with_audio(!no_audio);
            if let Some(ref path) = last {
                request = request.with_last_frame(FrameRef::from_file(path)?);
            }
            request.validate()?;

            let veo = factory.veo_client();
            let clip = PollPolicy::default().drive(&veo, &request).await?;
            clip.save(&output)?;
            println!("wrote {} ({} bytes)", output.display(), clip.size());
        }

        Command::Storyboard {
            plan,
            output_dir,
            asset,
            reuse,
            poll_interval,
            timeout,
        } => {
            let factory = factory()?;
            let plan = StoryboardPlan::from_json_file(&plan)?;
            let assets = ReferenceAsset::load_all(&asset)?;

            let orchestrator = Orchestrator::new(
                Arc::new(factory.gemini_client()),
                Arc::new(factory.veo_client()),
                output_dir,
            )
            .with_poll_policy(PollPolicy {
                interval: std::time::Duration::from_secs(poll_interval),
                timeout: std::time::Duration::from_secs(timeout),
                max_polls: None,
            })
            .with_reuse_existing(reuse);

            let report = orchestrator.run(&plan, &assets).await?;
            println!(
                "keyframes: {}, clips: {}",
                report.keyframes.len(),
                report.clips.len()
            );
            match report.final_video {
                Some(path) => println!("final video: {}", path.display()),
                None if report.partial() => {
                    println!("run was partial; no final video assembled")
                }
                None => println!("plan defined no clips; nothing to assemble"),
            }
        }

        Command::Concat { clips, output } => {
            let path = Concatenator::new().concatenate(&clips, &output).await?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

/// Builds the client factory, failing before any network call on bad setup.
fn factory() -> Result<ClientFactory> {
    let config = VertexConfig::from_env()
        .context("set VERTEX_AI_PROJECT_ID and VERTEX_AI_SERVICE_ACCOUNT_JSON")?;
    Ok(ClientFactory::new(config)?)
}

fn keyframer(
    factory: &ClientFactory,
    engine: Engine,
    has_subject: bool,
) -> Arc<dyn KeyframeGenerator> {
    match engine {
        Engine::Gemini => Arc::new(factory.gemini_client()),
        Engine::Imagen => {
            let client = factory.imagen_client();
            if has_subject {
                Arc::new(FallbackKeyframer::new(vec![
                    Arc::new(ImagenSubjectEdit(client.clone())),
                    Arc::new(ImagenTextToImage(client)),
                ]))
            } else {
                Arc::new(ImagenTextToImage(client))
            }
        }
    }
}
