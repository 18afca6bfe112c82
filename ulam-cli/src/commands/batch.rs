use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use ulam::geojson::sample_geometry;
use ulam::{GeoPoint, Session};

use super::DatasetArgs;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

const SAMPLE_COLUMNS: [&str; 5] = [
    "temperature_c",
    "pressure_kpa",
    "antipode_temperature_c",
    "antipode_pressure_kpa",
    "highlight",
];

#[allow(clippy::too_many_arguments)]
pub fn run(
    args: &DatasetArgs,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: String,
    lon_col: String,
    zoom: f64,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let session = args.session(at)?;

    // Detect file format
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => process_csv(&session, &input, output, &lat_col, &lon_col, zoom),
        "geojson" | "json" => process_geojson(&session, &input, output, zoom),
        _ => bail!(
            "Unsupported file format: {}. Use .csv or .geojson",
            extension
        ),
    }
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_climate.{}", stem, suffix))
}

/// Sampled columns for one row, or `invalid` markers for a bad coordinate.
fn sample_row(session: &Session, lat: f64, lon: f64, zoom: f64) -> Vec<String> {
    match GeoPoint::checked(lat, lon) {
        Ok(point) => {
            let pair = session.sample_pair(point, zoom);
            vec![
                pair.primary.label.temperature,
                pair.primary.label.pressure,
                pair.antipodal.label.temperature,
                pair.antipodal.label.pressure,
                pair.highlight.as_str().to_string(),
            ]
        }
        Err(_) => vec!["invalid".to_string(); SAMPLE_COLUMNS.len()],
    }
}

fn process_csv(
    session: &Session,
    input: &Path,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
    zoom: f64,
) -> Result<()> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let pb = progress_bar(records.len() as u64)?;

    let output_path = output.unwrap_or_else(|| default_output(input, "csv"));
    let output_file = File::create(&output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(SAMPLE_COLUMNS);
    writer.write_record(&new_headers)?;

    for record in records {
        let lat: f64 = record
            .get(lat_idx)
            .context("Missing latitude")?
            .trim()
            .parse()
            .context("Invalid latitude")?;
        let lon: f64 = record
            .get(lon_idx)
            .context("Missing longitude")?
            .trim()
            .parse()
            .context("Invalid longitude")?;

        let sampled = sample_row(session, lat, lon, zoom);
        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.extend(sampled.iter().map(String::as_str));
        writer.write_record(&new_record)?;

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn process_geojson(
    session: &Session,
    input: &Path,
    output: Option<PathBuf>,
    zoom: f64,
) -> Result<()> {
    let file = File::open(input).context("Failed to open input file")?;
    let reader = BufReader::new(file);

    let geojson: geojson::GeoJson =
        serde_json::from_reader(reader).context("Failed to parse GeoJSON")?;

    let geometries: Vec<geojson::Geometry> = match geojson {
        geojson::GeoJson::Geometry(geometry) => vec![geometry],
        geojson::GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        geojson::GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
    };

    let pb = progress_bar(geometries.len() as u64)?;
    let mut features = Vec::new();
    for geometry in &geometries {
        let sampled =
            sample_geometry(session, geometry, zoom).context("Failed to sample geometry")?;
        features.extend(sampled.features);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let result = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let output_path = output.unwrap_or_else(|| default_output(input, "geojson"));
    let output_file = File::create(&output_path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(output_file);
    serde_json::to_writer_pretty(&mut writer, &result)?;
    writer.flush()?;

    println!("Output written to: {}", output_path.display());
    Ok(())
}
