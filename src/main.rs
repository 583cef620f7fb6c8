use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use audioscribe::config::{Backend, Config, SpeechModel};
use audioscribe::decode::SymphoniaDecoder;
use audioscribe::models::ModelManager;
use audioscribe::pipeline::WhisperProvider;
use audioscribe::session::{Session, SubmitOutcome};
use audioscribe::source::SourceStore;

/// Transcribe audio files with a local speech-recognition model.
#[derive(Debug, Parser)]
#[command(name = "audioscribe", version, about)]
struct Cli {
    /// Audio files to transcribe.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Speech model to use (overrides config).
    #[arg(long, value_enum)]
    model: Option<SpeechModel>,

    /// Language to recognize, or "auto" (overrides config).
    #[arg(long)]
    language: Option<String>,

    /// Force CPU inference.
    #[arg(long)]
    cpu: bool,

    /// Path to an alternate config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(model) = cli.model {
        config.model.model = model;
    }
    if let Some(language) = cli.language {
        config.model.language = language;
    }
    if cli.cpu {
        config.provider.backend = Backend::Cpu;
    }

    let _guard = audioscribe::init_logging(&config)?;

    // Download progress surfaces on stderr once the first bytes arrive
    let download_bar = ProgressBar::hidden();
    download_bar.set_style(ProgressStyle::with_template(
        "{msg} {bar:30} {bytes}/{total_bytes}",
    )?);
    download_bar.set_message("Downloading model");

    let progress_bar = download_bar.clone();
    let manager = ModelManager::from_config(&config.provider)
        .context("Failed to prepare model storage")?
        .with_progress(Box::new(move |downloaded, total| {
            if let Some(total) = total {
                if progress_bar.is_hidden() {
                    progress_bar.set_draw_target(ProgressDrawTarget::stderr());
                }
                progress_bar.set_length(total);
            }
            progress_bar.set_position(downloaded);
        }));

    let provider = Arc::new(WhisperProvider::new(manager, &config.model));
    let decoder = Arc::new(SymphoniaDecoder);
    let sources = SourceStore::new(
        audioscribe::dirs::sources_dir()?.join(format!("session-{}", std::process::id())),
    )
    .context("Failed to prepare source store")?;

    let session = Session::start(&config, provider, decoder, sources);

    eprintln!("Loading speech model...");
    let ready = session.wait_until_ready().await;
    download_bar.finish_and_clear();

    if !ready {
        let snapshot = session.snapshot().await;
        anyhow::bail!(
            "{}",
            snapshot
                .error_message
                .unwrap_or_else(|| "Model load failed".to_string())
        );
    }

    let mut failures = 0usize;
    for file in &cli.files {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");

        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Transcribing {}", file.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let outcome = session.submit(name, bytes).await;
        spinner.finish_and_clear();

        match outcome {
            SubmitOutcome::Done => {
                let snapshot = session.snapshot().await;
                if snapshot.transcript.is_empty() {
                    println!("{}: (no speech recognized)", file.display());
                } else {
                    println!("{}: {}", file.display(), snapshot.transcript);
                }
            }
            SubmitOutcome::Failed => {
                failures += 1;
                let snapshot = session.snapshot().await;
                eprintln!(
                    "{}: {}",
                    file.display(),
                    snapshot.error_message.unwrap_or_default()
                );
            }
            SubmitOutcome::NotReady | SubmitOutcome::Superseded => {
                failures += 1;
                eprintln!("{}: upload was not processed", file.display());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) could not be transcribed");
    }
    Ok(())
}
