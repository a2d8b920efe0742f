//! CLI argument definitions and command handlers.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyreel_assemble::FfmpegEncoder;
use storyreel_core::{ScriptDescriptor, StoryreelConfig};
use storyreel_error::{StorageError, StorageErrorKind, StoryreelResult};
use storyreel_generate::{HttpAudioGenerator, HttpImageGenerator};
use storyreel_pipeline::{
    NoopNotifier, Notifier, PipelineCoordinator, RunManifest, RunReport, SlackNotifier,
};
use storyreel_storage::FileSystemStore;
use tracing::info;

/// Storyreel: produce narrated videos from scene scripts.
#[derive(Parser)]
#[command(name = "storyreel", version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Produce a video from a script file
    Run {
        /// Path to the script JSON file
        script: PathBuf,

        /// Also copy the final video to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Explicit configuration file (skips the layered lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding style reference images ({id}.png)
        #[arg(long)]
        reference_dir: Option<PathBuf>,
    },

    /// Parse and validate a script without spending generation calls
    Validate {
        /// Path to the script JSON file
        script: PathBuf,
    },

    /// Print the persisted manifest of a previous run
    Manifest {
        /// The run directory (contains manifest.json)
        run_dir: PathBuf,
    },
}

async fn read_script(path: &Path) -> StoryreelResult<ScriptDescriptor> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    ScriptDescriptor::from_json(&json)
}

fn load_config(path: Option<&Path>) -> StoryreelResult<StoryreelConfig> {
    match path {
        Some(path) => StoryreelConfig::from_file(path),
        None => StoryreelConfig::load(),
    }
}

/// Run a script through the full pipeline.
pub async fn run_script(
    script_path: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    reference_dir: Option<&Path>,
) -> StoryreelResult<RunReport> {
    let config = load_config(config_path)?;
    let script = read_script(script_path).await?;

    let store = Arc::new(FileSystemStore::new(
        Path::new(&config.run.runs_dir).join("artifacts"),
    )?);

    let mut image_generator = HttpImageGenerator::new(&config.generation.image_endpoint);
    if let Some(root) = reference_dir {
        image_generator = image_generator.with_reference_root(root);
    }
    let audio_generator = HttpAudioGenerator::new(&config.generation.audio_endpoint);

    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(SlackNotifier::new(url)),
        None => match std::env::var("STORYREEL_WEBHOOK_URL") {
            Ok(url) if !url.is_empty() => Arc::new(SlackNotifier::new(url)),
            _ => Arc::new(NoopNotifier),
        },
    };

    let coordinator = PipelineCoordinator::new(
        Arc::new(image_generator),
        Arc::new(audio_generator),
        store,
        Arc::new(FfmpegEncoder::default()),
        notifier,
        config,
    );

    let report = coordinator.run(script).await?;
    println!(
        "run {}: {} ({} scenes, {} failed)",
        report.run_id, report.status, report.scenes_total, report.scenes_failed
    );

    if let (Some(dest), Some(produced)) = (output, &report.output) {
        tokio::fs::copy(&produced.output_path, dest)
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "{}: {}",
                    dest.display(),
                    e
                )))
            })?;
        info!(dest = %dest.display(), "Copied final video");
    }

    Ok(report)
}

/// Parse a script and report what a run would produce.
pub async fn validate_script(script_path: &Path) -> StoryreelResult<()> {
    let script = read_script(script_path).await?;
    println!(
        "\"{}\" episode {}: {} scenes, {} with style references",
        script.title(),
        script.episode_number(),
        script.len(),
        script
            .scenes()
            .iter()
            .filter(|s| !s.style_refs().is_empty())
            .count()
    );
    Ok(())
}

/// Pretty-print a persisted run manifest.
pub async fn show_manifest(run_dir: &Path) -> StoryreelResult<()> {
    let manifest = RunManifest::load(run_dir).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&manifest)
            .map_err(|e| storyreel_error::JsonError::new(e.to_string()))?
    );
    Ok(())
}
