//! Snapshot selection by wall-clock time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::{Dataset, Snapshot};
use crate::geo::GeoPoint;

/// The snapshot currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectedTimestep {
    /// Index into the dataset's snapshot list.
    pub index: usize,
    /// Seconds after the reference epoch.
    pub offset_seconds: f64,
    /// Representative point of the snapshot.
    pub point: GeoPoint,
}

impl SelectedTimestep {
    fn from_snapshot(index: usize, snapshot: &Snapshot) -> Self {
        Self {
            index,
            offset_seconds: snapshot.offset_seconds,
            point: snapshot.point,
        }
    }
}

/// Seconds elapsed between the dataset's reference epoch and `now`.
///
/// Negative when `now` is before the epoch.
pub fn elapsed_seconds(dataset: &Dataset, now: DateTime<Utc>) -> f64 {
    (now - dataset.reference_epoch()).num_milliseconds() as f64 / 1000.0
}

/// Select the most recent snapshot whose offset has elapsed at `now`.
///
/// Returns `None` when every snapshot still lies in the future, which the
/// session treats as a signal to fall back to a known-good dataset.
///
/// # Example
///
/// ```ignore
/// // snapshots at 0 s, 600 s and 1200 s; 900 s have elapsed
/// let selected = select_timestep(&dataset, epoch + Duration::seconds(900)).unwrap();
/// assert_eq!(selected.index, 1);
/// ```
pub fn select_timestep(dataset: &Dataset, now: DateTime<Utc>) -> Option<SelectedTimestep> {
    let difference = elapsed_seconds(dataset, now);
    let snapshots = dataset.snapshots();
    // Snapshots are sorted, so the qualifying entries form a prefix.
    let qualifying = snapshots.partition_point(|s| s.offset_seconds <= difference);
    let index = qualifying.checked_sub(1)?;
    Some(SelectedTimestep::from_snapshot(index, &snapshots[index]))
}

/// The first snapshot of a dataset, used after a fallback.
pub fn first_timestep(dataset: &Dataset) -> SelectedTimestep {
    SelectedTimestep::from_snapshot(0, &dataset.snapshots()[0])
}
