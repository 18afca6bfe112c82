//! Gridded climate datasets and their snapshot lists.
//!
//! A [`Dataset`] holds two global fields (temperature and pressure at an
//! initial and a final forecast step) plus the list of snapshots: instants,
//! measured in seconds from the reference epoch, at which a representative
//! point is known.
//!
//! Datasets are validated on construction and immutable afterwards.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UlamError};
use crate::geo::GeoPoint;
use crate::grid::{Field, GridSpec, ScalarGrid, DEFAULT_RESOLUTION};

/// Default final forecast step: six hours after the reference epoch.
pub const DEFAULT_FINAL_TIMESTEP: f64 = 6.0 * 3600.0;

/// One time step of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    /// Seconds after the reference epoch.
    pub offset_seconds: f64,
    /// The representative point for this instant.
    pub point: GeoPoint,
}

/// Dataset in its wire form, as written by the upstream data pipeline.
///
/// Field grids are nested rows, `rows[j][i]`, with row 0 at the north pole
/// and column 0 at longitude -180. Snapshot points are `[lat, lng]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDataset {
    /// Reference epoch in UTC, e.g. `"2024-03-01T00:00:00.000"`.
    pub ds_datetime: String,
    /// `[offset_seconds, [lat, lng]]` entries, ascending by offset.
    pub ulamlist: Vec<(f64, (f64, f64))>,
    /// Temperature at the initial step (Kelvin).
    pub t_initial: Vec<Vec<f64>>,
    /// Pressure at the initial step (Pascal).
    pub p_initial: Vec<Vec<f64>>,
    /// Temperature at the final step (Kelvin).
    pub t_final: Vec<Vec<f64>>,
    /// Pressure at the final step (Pascal).
    pub p_final: Vec<Vec<f64>>,
    /// Initial step in seconds after the epoch.
    #[serde(default)]
    pub initial_timestep: f64,
    /// Final step in seconds after the epoch.
    #[serde(default = "default_final_timestep")]
    pub final_timestep: f64,
    /// Grid cell size in degrees.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_final_timestep() -> f64 {
    DEFAULT_FINAL_TIMESTEP
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

/// An immutable, validated climate dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    reference_epoch: DateTime<Utc>,
    snapshots: Vec<Snapshot>,
    initial: Field,
    final_field: Field,
    initial_timestep: f64,
    final_timestep: f64,
}

impl Dataset {
    /// Assemble a dataset from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the snapshot list is empty or not sorted ascending by offset
    /// - a snapshot offset is not finite or cannot be added to the epoch
    /// - the two fields have different grid shapes
    /// - the initial and final timesteps are equal or not finite
    pub fn new(
        reference_epoch: DateTime<Utc>,
        snapshots: Vec<Snapshot>,
        initial: Field,
        final_field: Field,
        initial_timestep: f64,
        final_timestep: f64,
    ) -> Result<Self> {
        if snapshots.is_empty() {
            return Err(UlamError::EmptySnapshotList);
        }
        for (index, snapshot) in snapshots.iter().enumerate() {
            if offset_instant(reference_epoch, snapshot.offset_seconds).is_none() {
                return Err(UlamError::InvalidSnapshotOffset {
                    index,
                    offset: snapshot.offset_seconds,
                });
            }
        }
        for (index, pair) in snapshots.windows(2).enumerate() {
            let (previous, offset) = (pair[0].offset_seconds, pair[1].offset_seconds);
            if offset < previous {
                return Err(UlamError::UnsortedSnapshots {
                    index: index + 1,
                    offset,
                    previous,
                });
            }
        }

        if initial.spec() != final_field.spec() {
            return Err(UlamError::InvalidGridShape {
                field: "final",
                expected_rows: initial.spec().lat_cells(),
                expected_cols: initial.spec().lon_cells(),
                rows: final_field.spec().lat_cells(),
                bad_row: 0,
                cols: final_field.spec().lon_cells(),
            });
        }

        if !initial_timestep.is_finite()
            || !final_timestep.is_finite()
            || initial_timestep == final_timestep
        {
            return Err(UlamError::InvalidTimesteps {
                initial: initial_timestep,
                final_: final_timestep,
            });
        }

        Ok(Self {
            reference_epoch,
            snapshots,
            initial,
            final_field,
            initial_timestep,
            final_timestep,
        })
    }

    /// The instant snapshot offsets are measured from.
    pub fn reference_epoch(&self) -> DateTime<Utc> {
        self.reference_epoch
    }

    /// The instant `offset_seconds` after the reference epoch, to the
    /// millisecond. `None` if it falls outside chrono's range.
    pub fn instant_at(&self, offset_seconds: f64) -> Option<DateTime<Utc>> {
        offset_instant(self.reference_epoch, offset_seconds)
    }

    /// Snapshots in ascending offset order. Never empty.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// The snapshot at `index`, if any.
    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Fields at the initial forecast step.
    pub fn initial_field(&self) -> &Field {
        &self.initial
    }

    /// Fields at the final forecast step.
    pub fn final_field(&self) -> &Field {
        &self.final_field
    }

    /// Initial forecast step in seconds after the epoch.
    pub fn initial_timestep(&self) -> f64 {
        self.initial_timestep
    }

    /// Final forecast step in seconds after the epoch.
    pub fn final_timestep(&self) -> f64 {
        self.final_timestep
    }

    /// Grid shape shared by every field.
    pub fn spec(&self) -> GridSpec {
        self.initial.spec()
    }
}

impl TryFrom<RawDataset> for Dataset {
    type Error = UlamError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let spec = GridSpec::new(raw.resolution)?;
        let reference_epoch = parse_epoch(&raw.ds_datetime)?;

        let snapshots = raw
            .ulamlist
            .into_iter()
            .map(|(offset_seconds, (lat, lng))| Snapshot {
                offset_seconds,
                point: GeoPoint::new(lat, lng),
            })
            .collect();

        let initial = Field::new(
            ScalarGrid::from_rows(spec, raw.t_initial, "t_initial")?,
            ScalarGrid::from_rows(spec, raw.p_initial, "p_initial")?,
        )?;
        let final_field = Field::new(
            ScalarGrid::from_rows(spec, raw.t_final, "t_final")?,
            ScalarGrid::from_rows(spec, raw.p_final, "p_final")?,
        )?;

        Dataset::new(
            reference_epoch,
            snapshots,
            initial,
            final_field,
            raw.initial_timestep,
            raw.final_timestep,
        )
    }
}

/// Parse a reference epoch.
///
/// Accepts RFC 3339 timestamps and zone-less ISO timestamps, which are
/// taken to be UTC.
pub fn parse_epoch(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| UlamError::InvalidTimestamp {
            value: value.to_string(),
        })
}

fn offset_instant(epoch: DateTime<Utc>, offset_seconds: f64) -> Option<DateTime<Utc>> {
    let millis = (offset_seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    TimeDelta::try_milliseconds(millis as i64).and_then(|delta| epoch.checked_add_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::TimeZone;

    #[test]
    fn test_parse_epoch_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        assert_eq!(parse_epoch("2024-03-01T06:00:00.000").unwrap(), expected);
        assert_eq!(parse_epoch("2024-03-01T06:00:00").unwrap(), expected);
        assert_eq!(parse_epoch("2024-03-01T06:00:00Z").unwrap(), expected);
        assert_eq!(parse_epoch("2024-03-01T08:00:00+02:00").unwrap(), expected);
        assert!(parse_epoch("yesterday").is_err());
    }

    #[test]
    fn test_from_raw() {
        let raw = fixtures::raw_dataset(&[0.0, 600.0, 1200.0]);
        let dataset = Dataset::try_from(raw).unwrap();

        assert_eq!(dataset.snapshots().len(), 3);
        assert_eq!(dataset.snapshot(1).unwrap().offset_seconds, 600.0);
        assert_eq!(dataset.snapshot(1).unwrap().point, GeoPoint::new(11.0, 21.0));
        assert_eq!(dataset.spec().lon_cells(), 36);
        assert_eq!(dataset.reference_epoch(), fixtures::epoch());
        assert_eq!(dataset.initial_timestep(), 0.0);
        assert_eq!(dataset.final_timestep(), 1200.0);
    }

    #[test]
    fn test_raw_defaults() {
        let json = r#"{
            "ds_datetime": "2024-03-01T00:00:00.000",
            "ulamlist": [[0, [1.5, 2.5]]],
            "t_initial": [], "p_initial": [], "t_final": [], "p_final": []
        }"#;
        let raw: RawDataset = serde_json::from_str(json).unwrap();
        assert_eq!(raw.initial_timestep, 0.0);
        assert_eq!(raw.final_timestep, 21600.0);
        assert_eq!(raw.resolution, 0.4);
        assert_eq!(raw.ulamlist[0], (0.0, (1.5, 2.5)));
        // Empty grids do not match the 0.4° shape
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidGridShape { field: "t_initial", .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_offsets() {
        let raw = fixtures::raw_dataset(&[f64::NAN, 0.0, 600.0, 1200.0]);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidSnapshotOffset { index: 0, .. })
        ));

        let raw = fixtures::raw_dataset(&[0.0, 600.0, f64::INFINITY]);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidSnapshotOffset { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_offsets_outside_time_range() {
        let raw = fixtures::raw_dataset(&[-1.0e17, 600.0]);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidSnapshotOffset { index: 0, .. })
        ));

        let dataset = fixtures::dataset(&[0.0, 600.0]);
        assert_eq!(
            dataset.instant_at(600.0),
            Some(fixtures::epoch() + TimeDelta::seconds(600))
        );
        assert_eq!(dataset.instant_at(1.0e17), None);
    }

    #[test]
    fn test_rejects_unsorted_snapshots() {
        let raw = fixtures::raw_dataset(&[0.0, 1200.0, 600.0]);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::UnsortedSnapshots { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_empty_snapshots() {
        let raw = fixtures::raw_dataset(&[]);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::EmptySnapshotList)
        ));
    }

    #[test]
    fn test_rejects_equal_timesteps() {
        let mut raw = fixtures::raw_dataset(&[0.0]);
        raw.final_timestep = raw.initial_timestep;
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidTimesteps { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_epoch() {
        let mut raw = fixtures::raw_dataset(&[0.0]);
        raw.ds_datetime = "not a date".to_string();
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_rejects_ragged_field() {
        let mut raw = fixtures::raw_dataset(&[0.0]);
        raw.p_final[3].push(1.0);
        assert!(matches!(
            Dataset::try_from(raw),
            Err(UlamError::InvalidGridShape {
                field: "p_final",
                bad_row: 3,
                ..
            })
        ));
    }
}
