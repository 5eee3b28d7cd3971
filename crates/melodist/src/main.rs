//! melodist - detect, correct and embellish melodies in MIDI files
//!
//! Subcommands:
//! - `melodist classify <file>` - Print the detected key
//! - `melodist correct <file>` - Snap out-of-key notes to the key
//! - `melodist train [dir]` - Train the interval model from a folder
//! - `melodist enhance <file>...` - Classify, correct, train and embellish

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use melodist::commands::{self, CorrectOutcome, Settings};
use melodyconf::MelodistConfig;
use std::path::PathBuf;
use tonality::{Classification, Key};
use tracing::debug;

#[derive(Parser)]
#[command(name = "melodist")]
#[command(about = "Key detection and melody embellishment for MIDI files")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./melodist.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chance of filling each gap between notes, in [0, 1]
    #[arg(long, global = true)]
    insert_prob: Option<f64>,

    /// Seed for reproducible output
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Folder of training MIDI files
    #[arg(long, global = true)]
    training_dir: Option<PathBuf>,

    /// Directory for corrected and enhanced files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected key and its relative key
    Classify {
        /// MIDI file to analyze
        file: PathBuf,
    },

    /// Correct out-of-key notes and save a copy
    Correct {
        /// MIDI file to correct
        file: PathBuf,

        /// Key to correct to (e.g. "D-minor"); detected when omitted
        #[arg(short, long)]
        key: Option<Key>,
    },

    /// Train the interval model and print a summary per key
    Train {
        /// Folder of training MIDI files (overrides config)
        dir: Option<PathBuf>,

        /// Stop after this many files
        #[arg(short, long)]
        max_files: Option<usize>,

        /// Save the trained model as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline on one or more files
    Enhance {
        /// MIDI files to enhance
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Use a saved model instead of training
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Key to use instead of the detected one
        #[arg(short, long)]
        key: Option<Key>,
    },
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn settings_for(cli: &Cli, config: &MelodistConfig) -> Result<Settings> {
    let mut settings = Settings::from(config);
    if let Some(p) = cli.insert_prob {
        if p.is_nan() || !(0.0..=1.0).contains(&p) {
            bail!("--insert-prob must be within [0, 1], got {p}");
        }
        settings.insert_prob = p;
    }
    if let Some(seed) = cli.seed {
        settings.seed = Some(seed);
    }
    if let Some(dir) = &cli.training_dir {
        settings.training_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    Ok(settings)
}

fn print_classification(classification: &Classification) {
    match classification {
        Classification::Unknown => println!("Detected key: Unknown"),
        Classification::Known { key, relative } => {
            println!("Detected key: {key}");
            println!("Relative key: {relative}");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = MelodistConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config.logging.log_level);
    debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let mut settings = settings_for(&cli, &config)?;

    match cli.command {
        Commands::Classify { file } => {
            let report = commands::classify_file(&file)?;
            println!("{}: {} notes", file.display(), report.note_count);
            print_classification(&report.classification);
        }
        Commands::Correct { file, key } => {
            match commands::correct_file(&file, key, &settings.output_dir)? {
                CorrectOutcome::AlreadyInKey { key } => {
                    println!("All notes already in {key}, nothing to correct");
                }
                CorrectOutcome::Corrected {
                    key,
                    output,
                    changed,
                } => {
                    println!("Corrected {changed} notes to {key}");
                    println!("Saved corrected file as: {}", output.display());
                }
            }
        }
        Commands::Train {
            dir,
            max_files,
            output,
        } => {
            if let Some(dir) = dir {
                settings.training_dir = dir;
            }
            if max_files.is_some() {
                settings.max_training_files = max_files;
            }
            let model = commands::obtain_model(&settings, None)?;
            if model.is_empty() {
                println!("No intervals found in {}", settings.training_dir.display());
            }
            for (key, distribution) in model.iter() {
                let likeliest = distribution
                    .iter()
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(interval, p)| format!("{interval:+} ({p:.3})"))
                    .unwrap_or_default();
                println!(
                    "{key}: {} intervals, most likely {likeliest}",
                    distribution.len()
                );
            }
            if let Some(path) = output {
                model
                    .save(&path)
                    .with_context(|| format!("saving model to {}", path.display()))?;
                println!("Saved model as: {}", path.display());
            }
        }
        Commands::Enhance { files, model, key } => {
            let model = commands::obtain_model(&settings, model.as_deref())?;
            let mut chooser = settings.chooser();
            let (reports, failures) =
                commands::enhance_files(&files, &model, key, &settings, chooser.as_mut());

            for report in &reports {
                println!("Detected key: {} (relative {})", report.key, report.relative);
                if let Some(corrected) = &report.corrected_output {
                    println!("Saved corrected file as: {}", corrected.display());
                }
                println!("-ORIGINAL NOTE COUNT: {}", report.original_notes);
                println!("-CORRECTED NOTE COUNT: {}", report.corrected_notes);
                println!("-ENHANCED NOTE COUNT: {}", report.enhanced_notes);
                println!("Saved enhanced file as: {}", report.enhanced_output.display());
            }
            if failures > 0 {
                bail!("{failures} of {} inputs failed", files.len());
            }
        }
    }

    Ok(())
}
