use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use ulam::{GeoPoint, Highlight, PairedSample, SelectedTimestep};

use super::DatasetArgs;

#[derive(Serialize)]
struct SampleResponse {
    #[serde(flatten)]
    pair: PairedSample,
    timestep: SelectedTimestep,
    last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
}

pub fn run(
    args: &DatasetArgs,
    lat: f64,
    lon: f64,
    zoom: f64,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let point = GeoPoint::checked(lat, lon).context("Invalid coordinate")?;
    let session = args.session(at)?;
    let pair = session.sample_pair(point, zoom);

    if json {
        let response = SampleResponse {
            pair,
            timestep: session.selected(),
            last_updated: session.last_updated(),
            degraded: session.is_degraded(),
        };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    let marker = |matches: bool| if matches { " *" } else { "" };
    let (temperature_match, pressure_match) = match pair.highlight {
        Highlight::Both => (true, true),
        Highlight::Temperature => (true, false),
        Highlight::Pressure => (false, true),
        Highlight::None => (false, false),
    };

    for (name, sample) in [("here", &pair.primary), ("antipode", &pair.antipodal)] {
        println!(
            "{:<9} ({}°, {}°)  {}°C{}  {}kPa{}",
            name,
            sample.label.latitude,
            sample.label.longitude,
            sample.label.temperature,
            marker(temperature_match),
            sample.label.pressure,
            marker(pressure_match),
        );
    }
    println!(
        "Data valid at {}",
        session.last_updated().format("%Y-%m-%d %H:%M UTC")
    );
    if session.is_degraded() {
        eprintln!("warning: no current snapshot, showing the fallback dataset");
    }

    Ok(())
}
