mod api;
mod config;
mod error;
mod export;
mod run;
mod scene;

use anyhow::Context;
use api::GeminiClient;
use clap::Parser;
use config::{AspectRatio, ReferenceImage, SceneDensity, StoryboardConfig};
use error::Result;
use run::{CancelToken, RunEvent, StoryboardRun};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "storyboard-gen")]
#[command(about = "AI storyboard generation tool: script to scene images", long_about = None)]
struct Args {
    /// Script text for storyboard generation
    #[arg(short, long)]
    script: Option<String>,

    /// Script file path
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Base art style, free text or a preset name
    #[arg(long, default_value = "Cinematic live action")]
    style: String,

    /// Style reference image path
    #[arg(long)]
    style_ref: Option<PathBuf>,

    /// Main character description for continuity
    #[arg(long)]
    character: Option<String>,

    /// Character reference image path
    #[arg(long)]
    character_ref: Option<PathBuf>,

    /// Screen ratio for generated frames
    #[arg(long, value_enum, default_value_t = AspectRatio::NineSixteen)]
    aspect_ratio: AspectRatio,

    /// Scene density when no explicit count is given
    #[arg(long, value_enum, default_value_t = SceneDensity::Standard)]
    density: SceneDensity,

    /// Explicit scene count (0 = derive from script length and density)
    #[arg(long, default_value_t = 0)]
    count: u32,

    /// Output directory for export files
    #[arg(short, long, default_value = "./storyboard")]
    out_dir: PathBuf,

    /// Gemini API key
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let api_key = if let Some(key) = args.api_key.clone() {
        key
    } else if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        key
    } else {
        eprintln!("Error: GEMINI_API_KEY not found. Please set it via --api-key or GEMINI_API_KEY environment variable");
        std::process::exit(1);
    };

    let script = if let Some(text) = args.script.clone() {
        text
    } else if let Some(path) = args.file.clone() {
        tokio::fs::read_to_string(&path)
            .await
            .context(format!("Failed to read file: {}", path.display()))?
    } else {
        eprintln!("Error: Either --script or --file must be provided");
        std::process::exit(1);
    };

    info!("Starting storyboard generation...");
    info!("Script length: {} characters", script.chars().count());

    if let Err(e) = run_generation(args, script, api_key).await {
        error!("Storyboard generation failed: {}", e);
        std::process::exit(1);
    }

    info!("Storyboard generation completed!");
    Ok(())
}

async fn run_generation(args: Args, script: String, api_key: String) -> Result<()> {
    let style_image = match &args.style_ref {
        Some(path) => Some(ReferenceImage::from_file(path).await?),
        None => None,
    };
    let character_image = match &args.character_ref {
        Some(path) => Some(ReferenceImage::from_file(path).await?),
        None => None,
    };

    let config = StoryboardConfig {
        style: args.style,
        aspect_ratio: args.aspect_ratio,
        density: args.density,
        target_scene_count: args.count,
        script,
        main_character: args.character.unwrap_or_default(),
        style_image,
        character_image,
    };

    let gateway = Arc::new(GeminiClient::new(api_key));
    let mut run = StoryboardRun::new(gateway, config);

    // Ctrl-C maps to cooperative cancellation: the request in flight still
    // completes, remaining scenes are skipped and partial results exported.
    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing the scene in flight...");
            ctrl_c_cancel.cancel();
        }
    });

    let mut events = run.subscribe();
    let progress = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RunEvent::AnalysisStarted => info!("Step 1/2: Analyzing script..."),
                RunEvent::AnalysisCompleted { scene_count } => {
                    info!("Step 2/2: Generating images for {} scenes...", scene_count)
                }
                RunEvent::SceneStarted { index } => {
                    info!("Generating image for scene {}...", index + 1)
                }
                RunEvent::SceneCompleted { index } => info!("Scene {} complete", index + 1),
                RunEvent::SceneFailed { index, error } => {
                    warn!("Scene {} failed: {}", index + 1, error)
                }
                RunEvent::RunCancelled => warn!("Generation cancelled"),
                RunEvent::RunFinished => info!("Generation run finished"),
            }
        }
    });

    run.generate(&cancel).await?;

    if let Some(analysis) = run.analysis() {
        info!("Global style guide: {}", analysis.global_style_guide);
    }
    let generated = run.scenes().iter().filter(|s| s.image.is_some()).count();
    info!("{}/{} scene images generated", generated, run.scenes().len());

    export::write_all(&args.out_dir, run.scenes()).await?;

    drop(run);
    let _ = progress.await;
    Ok(())
}
