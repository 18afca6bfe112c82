use anyhow::Result;
use ulam::interpolate::{kelvin_to_celsius, pascal_to_kilopascal};
use ulam::{DatasetOrigin, ScalarGrid};

use super::DatasetArgs;

pub fn run(args: &DatasetArgs) -> Result<()> {
    let session = args.session(None)?;
    let dataset = session.dataset();
    let spec = dataset.spec();
    let snapshots = dataset.snapshots();

    println!("Reference epoch: {}", dataset.reference_epoch());
    println!(
        "Grid: {}° ({}x{} cells)",
        spec.resolution(),
        spec.lon_cells(),
        spec.lat_cells()
    );
    println!(
        "Forecast steps: +{}s -> +{}s",
        dataset.initial_timestep(),
        dataset.final_timestep()
    );
    if let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) {
        println!(
            "Snapshots: {} (+{}s to +{}s)",
            snapshots.len(),
            first.offset_seconds,
            last.offset_seconds
        );
    }
    println!();

    print_range(
        "Initial temperature",
        dataset.initial_field().temperature(),
        kelvin_to_celsius,
        "°C",
    );
    print_range(
        "Initial pressure",
        dataset.initial_field().pressure(),
        pascal_to_kilopascal,
        "kPa",
    );
    print_range(
        "Final temperature",
        dataset.final_field().temperature(),
        kelvin_to_celsius,
        "°C",
    );
    print_range(
        "Final pressure",
        dataset.final_field().pressure(),
        pascal_to_kilopascal,
        "kPa",
    );
    println!();

    let selected = session.selected();
    println!(
        "Current snapshot: {} (+{}s) at {}, {}",
        selected.index, selected.offset_seconds, selected.point.lat, selected.point.lng
    );
    println!(
        "Data valid at: {}",
        session.last_updated().format("%Y-%m-%d %H:%M UTC")
    );
    if session.origin() == DatasetOrigin::Fallback || session.is_degraded() {
        println!("Status: degraded (no snapshot has elapsed yet)");
    }

    Ok(())
}

fn print_range(name: &str, grid: &ScalarGrid, convert: fn(f64) -> f64, unit: &str) {
    if let Some((min, max)) = grid.min_max() {
        println!(
            "{}: {:.2}{} to {:.2}{}",
            name,
            convert(min),
            unit,
            convert(max),
            unit
        );
    }
}
