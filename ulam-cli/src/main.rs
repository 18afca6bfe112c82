use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::DatasetArgs;

/// Antipodal temperature and pressure CLI tool
#[derive(Parser)]
#[command(name = "ulam")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample temperature and pressure at a point and its antipode
    Sample {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Map zoom level, controls displayed precision
        #[arg(short, long, default_value = "3")]
        zoom: f64,

        /// Instant to sample (RFC 3339), defaults to now
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the antipode of a coordinate
    Antipode {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show which snapshot applies at a given instant
    Timestep {
        /// Instant to select for (RFC 3339), defaults to now
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display information about the dataset
    Info,

    /// Sample many coordinates from a file
    Batch {
        /// Input file (CSV or GeoJSON)
        input: PathBuf,

        /// Output file (same format as input if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude (CSV only)
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude (CSV only)
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Map zoom level, controls displayed precision
        #[arg(short, long, default_value = "3")]
        zoom: f64,

        /// Instant to sample (RFC 3339), defaults to now
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    ulam::dataset::parse_epoch(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sample {
            lat,
            lon,
            zoom,
            at,
            json,
        } => commands::sample::run(&cli.dataset, lat, lon, zoom, at, json),
        Commands::Antipode { lat, lon, json } => commands::antipode::run(lat, lon, json),
        Commands::Timestep { at, json } => commands::timestep::run(&cli.dataset, at, json),
        Commands::Info => commands::info::run(&cli.dataset),
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
            zoom,
            at,
        } => commands::batch::run(&cli.dataset, input, output, lat_col, lon_col, zoom, at),
    }
}
