//! Session pipeline CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ephys_session::prelude::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ephys")]
#[command(version = "0.1.0")]
#[command(about = "Post-sorting session pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a session input directory
    Run {
        /// Session input directory (session.json, sorter.bin, trials.json)
        session_dir: PathBuf,

        /// Artifact output directory
        #[arg(short, long, default_value = "artifacts")]
        output: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Re-run stitching only, over existing artifacts
    Stitch {
        /// Session input directory
        session_dir: PathBuf,

        /// Artifact output directory
        #[arg(short, long, default_value = "artifacts")]
        output: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate a synthetic session input directory
    Synth {
        /// Output directory
        output: PathBuf,

        /// Number of recordings
        #[arg(short, long, default_value_t = 2)]
        recordings: usize,

        /// Number of clusters
        #[arg(short = 'k', long, default_value_t = 6)]
        clusters: usize,

        /// Duration of each recording in seconds
        #[arg(short, long, default_value_t = 60.0)]
        duration: f64,

        /// RNG seed
        #[arg(short, long, default_value_t = 7)]
        seed: u64,
    },

    /// Print a session's cluster catalog summary
    Info {
        /// Session input directory
        session_dir: PathBuf,
    },
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Run {
            session_dir,
            output,
            config,
        } => {
            let config = load_config(&config)?;
            let inputs = load_session_inputs(&session_dir)
                .with_context(|| format!("loading session at {}", session_dir.display()))?;
            let pipeline = Pipeline::new(config, SessionStore::open(&output)?)?;
            let summary = pipeline.run(&inputs)?;
            print_summary(&summary);
            Ok(())
        }

        Commands::Stitch {
            session_dir,
            output,
            config,
        } => {
            let config = load_config(&config)?;
            let inputs = load_session_inputs(&session_dir)?;
            let pipeline = Pipeline::new(config, SessionStore::open(&output)?)?;
            let table = pipeline.stitch(&inputs)?;
            println!(
                "stitched {} neurons across {} recordings",
                table.rows.len(),
                table.recordings.len()
            );
            Ok(())
        }

        Commands::Synth {
            output,
            recordings,
            clusters,
            duration,
            seed,
        } => {
            let synth_config = SynthConfig {
                n_recordings: recordings,
                n_clusters: clusters,
                duration_sec: duration,
                seed,
                ..Default::default()
            };
            let session = generate(&synth_config)?;
            let inputs = SessionInputs {
                attributes: session.attributes,
                sorter: session.sorter,
                group: session.group,
                trials: session.trials,
                geometry: session.geometry,
            };
            save_session_inputs(&output, &inputs)?;
            println!(
                "wrote synthetic session ({} recordings, {} spikes) to {}",
                recordings,
                inputs.sorter.n_spikes(),
                output.display()
            );
            Ok(())
        }

        Commands::Info { session_dir } => {
            let inputs = load_session_inputs(&session_dir)?;
            let stats = inputs.sorter.catalog_stats();
            println!("session:    {}", inputs.group.id());
            println!("recordings: {}", inputs.group.recordings.len());
            println!("clusters:   {}", stats.n_clusters);
            println!("spikes:     {}", stats.n_spikes);
            println!(
                "labels:     {} good, {} mua, {} noise, {} unsorted",
                stats.n_good, stats.n_mua, stats.n_noise, stats.n_unsorted
            );
            println!("trials:     {}", inputs.trials.len());
            Ok(())
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("session {}", summary.session_id);
    for rec in &summary.recordings {
        println!(
            "  {}: {} spikes, {} clusters{}{}",
            rec.recording_id,
            rec.n_spikes,
            rec.n_clusters,
            if rec.aligned { "" } else { " (unaligned)" },
            if rec.n_raster_failures > 0 {
                format!(", {} raster failures", rec.n_raster_failures)
            } else {
                String::new()
            }
        );
    }
    for id in &summary.skipped {
        println!("  {}: skipped on error", id);
    }
    match summary.stitch_rows {
        Some(rows) => println!("  stitch table: {} neurons", rows),
        None => println!("  stitch table: not produced"),
    }
}
