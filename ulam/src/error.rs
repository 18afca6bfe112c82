//! Error types for the ulam library.

use thiserror::Error;

/// Errors that can occur when loading datasets or validating input.
///
/// Missing data for the current time is *not* an error: the session recovers
/// from it by substituting the fallback dataset.
#[derive(Error, Debug)]
pub enum UlamError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset payload is not valid JSON.
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The dataset reference epoch could not be parsed.
    #[error("Invalid reference epoch: {value}")]
    InvalidTimestamp { value: String },

    /// A field grid does not match the dimensions of the grid spec.
    #[error("Invalid grid shape for {field}: expected {expected_rows}x{expected_cols}, found {rows} rows (row {bad_row} has {cols} columns)")]
    InvalidGridShape {
        field: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        bad_row: usize,
        cols: usize,
    },

    /// The grid resolution does not divide the globe into whole cells.
    #[error("Invalid grid resolution: {resolution}° (must divide 180° evenly)")]
    InvalidResolution { resolution: f64 },

    /// Snapshot offsets are not in ascending order.
    #[error("Snapshot list is not sorted: offset {offset} at index {index} follows {previous}")]
    UnsortedSnapshots {
        index: usize,
        offset: f64,
        previous: f64,
    },

    /// A snapshot offset is not finite or lands outside the representable
    /// time range.
    #[error("Invalid snapshot offset {offset}s at index {index}")]
    InvalidSnapshotOffset { index: usize, offset: f64 },

    /// The dataset has no snapshots at all.
    #[error("Snapshot list is empty")]
    EmptySnapshotList,

    /// Initial and final timesteps coincide, so no time blend is possible.
    #[error("Invalid timesteps: initial={initial}s, final={final_}s (must differ)")]
    InvalidTimesteps { initial: f64, final_: f64 },

    /// Coordinates are outside the valid geographic range.
    #[error("Coordinates out of bounds: lat={lat}, lon={lon} (valid: lat ±90°, lon ±180°)")]
    OutOfBounds { lat: f64, lon: f64 },

    /// A coordinate is malformed.
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    /// A pointer file did not contain a dataset URL.
    #[error("Invalid pointer file: {reason}")]
    InvalidPointer { reason: String },

    /// Required configuration is absent.
    #[error("Missing configuration: {name}")]
    MissingConfig { name: &'static str },

    /// Failed to download a dataset or pointer file.
    #[cfg(feature = "download")]
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },
}

/// Result type alias using [`UlamError`].
pub type Result<T> = std::result::Result<T, UlamError>;
