//! Small datasets shared by the unit tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::dataset::{Dataset, RawDataset};

/// Cell size of fixture grids (36 × 18 cells).
pub const RESOLUTION: f64 = 10.0;
pub const LON_CELLS: usize = 36;
pub const LAT_CELLS: usize = 18;

pub const EPOCH: &str = "2024-03-01T00:00:00.000";

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn grid(value: f64) -> Vec<Vec<f64>> {
    vec![vec![value; LON_CELLS]; LAT_CELLS]
}

/// Uniform fields: 290 K / 100 kPa initially, 296 K / 101.2 kPa at 1200 s.
/// Snapshot `k` sits at `(10 + k, 20 + k)`.
pub fn raw_dataset(offsets: &[f64]) -> RawDataset {
    RawDataset {
        ds_datetime: EPOCH.to_string(),
        ulamlist: offsets
            .iter()
            .enumerate()
            .map(|(k, &offset)| (offset, (10.0 + k as f64, 20.0 + k as f64)))
            .collect(),
        t_initial: grid(290.0),
        p_initial: grid(100_000.0),
        t_final: grid(296.0),
        p_final: grid(101_200.0),
        initial_timestep: 0.0,
        final_timestep: 1200.0,
        resolution: RESOLUTION,
    }
}

pub fn dataset(offsets: &[f64]) -> Arc<Dataset> {
    Arc::new(Dataset::try_from(raw_dataset(offsets)).unwrap())
}

/// An older dataset used as the fallback, anchored a day earlier.
pub fn fallback_dataset() -> Arc<Dataset> {
    let mut raw = raw_dataset(&[0.0, 300.0]);
    raw.ds_datetime = "2024-02-29T00:00:00.000".to_string();
    raw.ulamlist = vec![(0.0, (-5.0, 40.0)), (300.0, (-6.0, 41.0))];
    Arc::new(Dataset::try_from(raw).unwrap())
}
