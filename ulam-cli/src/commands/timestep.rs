use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use ulam::{DatasetOrigin, SelectedTimestep};

use super::DatasetArgs;

#[derive(Serialize)]
struct TimestepResponse {
    timestep: SelectedTimestep,
    origin: DatasetOrigin,
    reference_epoch: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    automatic_updates: bool,
}

pub fn run(args: &DatasetArgs, at: Option<DateTime<Utc>>, json: bool) -> Result<()> {
    let session = args.session(at)?;
    let selected = session.selected();

    if json {
        let response = TimestepResponse {
            timestep: selected,
            origin: session.origin(),
            reference_epoch: session.dataset().reference_epoch(),
            last_updated: session.last_updated(),
            automatic_updates: session.automatic_updates(),
        };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    println!(
        "Snapshot {} of {} (+{}s)",
        selected.index,
        session.dataset().snapshots().len(),
        selected.offset_seconds
    );
    println!("Point: {}, {}", selected.point.lat, selected.point.lng);
    let antipode = selected.point.antipode();
    println!("Antipode: {}, {}", antipode.lat, antipode.lng);
    println!(
        "Data valid at {}",
        session.last_updated().format("%Y-%m-%d %H:%M UTC")
    );
    if session.origin() == DatasetOrigin::Fallback {
        println!("Source: fallback dataset");
    }

    Ok(())
}
