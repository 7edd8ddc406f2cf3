//! EEG Constellation - Main Entry Point

use anyhow::Context;
use clap::{Parser, Subcommand};
use fragment_store::{ArchiveKeys, FragmentLayout, Splitter};
use pipeline::{init_logging, Pipeline, PipelineConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(name = "eeg-constellation", version, about = "EEG band-power constellation pipeline")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a monolithic archive into numbered fragment files
    Split {
        /// `.npy` feature array, `.npz` with `input`/`label`, or a postcard archive
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 10)]
        chunks: usize,
        /// Fragment file name stem
        #[arg(long, default_value = "train")]
        stem: String,
    },
    /// Run the pipeline and write the scene as JSON
    Render {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Jitter seed, overrides the configured one
        #[arg(long)]
        seed: Option<u64>,
        /// Fragment directory, overrides the configured one
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Scene file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_logging(level, cli.log_json);

    info!("=== EEG Constellation v{} ===", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Command::Split {
            input,
            output,
            chunks,
            stem,
        } => split(input, output, chunks, stem),
        Command::Render {
            config,
            seed,
            data_dir,
            output,
        } => render(config, seed, data_dir, output),
    };

    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}

fn split(input: PathBuf, output: PathBuf, chunks: usize, stem: String) -> anyhow::Result<()> {
    let layout = FragmentLayout {
        stem,
        ..Default::default()
    };
    let summary = Splitter::new(layout, ArchiveKeys::default())
        .split_file(&input, &output, chunks)
        .with_context(|| format!("splitting {}", input.display()))?;

    info!(
        "Wrote {} chunks covering {} subjects to {} (labels: {})",
        summary.chunks,
        summary.subjects,
        output.display(),
        summary.labels_written
    );
    Ok(())
}

fn render(
    config: Option<PathBuf>,
    seed: Option<u64>,
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut settings = PipelineConfig::load(config.as_deref())?;
    if let Some(dir) = data_dir {
        settings.loader.data_dir = dir;
    }
    let seed = seed.or(settings.seed);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut pipeline = Pipeline::new(settings);
    let scene = pipeline.render_configured(&mut rng)?;
    let json = serde_json::to_string_pretty(&scene).context("serializing scene")?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Scene with {} points written to {}", scene.point_count(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
