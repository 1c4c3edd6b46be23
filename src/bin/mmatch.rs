//! CLI entry point for the `mmatch` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use motion_match::cli::commands::{self, parse_mask, parse_vector};
use motion_match::index::DistanceMetric;
use motion_match::MotionError;

#[derive(Parser)]
#[command(
    name = "mmatch",
    about = "Motion matching: bake pose databases and search them"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable info-level logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake a clip library (JSON) into an .mmdb file
    Bake {
        /// Clip library JSON file
        clips: PathBuf,
        /// Output .mmdb file
        #[arg(short, long)]
        output: PathBuf,
        /// Matcher configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Character motion scale
        #[arg(long, default_value = "1.0")]
        motion_scale: f32,
    },
    /// Display information about an .mmdb file
    Info {
        /// Path to the .mmdb file
        file: PathBuf,
    },
    /// Per-dimension mean, variance, weight and density
    Stats {
        /// Path to the .mmdb file
        file: PathBuf,
        /// Show one dimension, with its density histogram
        #[arg(long)]
        dimension: Option<usize>,
    },
    /// Nearest poses to a raw feature vector
    Search {
        /// Path to the .mmdb file
        file: PathBuf,
        /// Comma-separated feature vector
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Number of results
        #[arg(short, default_value = "1")]
        k: usize,
        /// Categories a result may carry (decimal, 0x or 0b)
        #[arg(long, value_parser = parse_mask, default_value = "0xFFFFFFFFFFFFFFFF")]
        include: u64,
        /// Categories a result must not carry
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        exclude: u64,
        /// Normalize the query with the stored statistics first
        #[arg(long)]
        normalize: bool,
        /// Override the stored metric: chebyshev, manhattan, squared_euclidean
        #[arg(long)]
        metric: Option<DistanceMetric>,
    },
    /// Write a default configuration file
    InitConfig {
        /// Output path
        #[arg(default_value = "mmatch.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Bake {
            clips,
            output,
            config,
            motion_scale,
        } => commands::cmd_bake(&clips, config.as_deref(), &output, motion_scale, json),
        Commands::Info { file } => commands::cmd_info(&file, json),
        Commands::Stats { file, dimension } => commands::cmd_stats(&file, dimension, json),
        Commands::Search {
            file,
            query,
            k,
            include,
            exclude,
            normalize,
            metric,
        } => {
            let query = match parse_vector(&query) {
                Ok(query) => query,
                Err(e) => {
                    eprintln!("Invalid query: {}", e);
                    process::exit(3);
                }
            };
            commands::cmd_search(&file, &query, k, include, exclude, normalize, metric, json)
        }
        Commands::InitConfig { path, force } => commands::cmd_init_config(&path, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            MotionError::Io(_) => 1,
            MotionError::InvalidMagic
            | MotionError::UnsupportedVersion(_)
            | MotionError::Truncated
            | MotionError::Corrupt(_)
            | MotionError::Compression(_) => 2,
            MotionError::InvalidConfig(_)
            | MotionError::InvalidMetric(_)
            | MotionError::Json(_)
            | MotionError::NoProviders
            | MotionError::MissingCategoryTrack { .. }
            | MotionError::WeightHintMismatch { .. } => 3,
            MotionError::DimensionMismatch { .. } => 4,
            _ => 1,
        };
        process::exit(code);
    }
}
