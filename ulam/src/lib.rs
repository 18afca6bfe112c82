//! # Ulam - Antipodal Climate Sampling
//!
//! Samples gridded global temperature and pressure forecasts at any point on
//! the globe and at its antipode, for the current wall-clock time.
//!
//! ## Features
//!
//! - **Wraparound grids**: bilinear sampling that is total across the poles
//!   and the antimeridian
//! - **Time blending**: linear interpolation between an initial and a final
//!   forecast step
//! - **Snapshot selection**: picks the latest elapsed snapshot, with a
//!   fallback dataset when none has elapsed
//! - **Display policy**: zoom-dependent rounding and antipodal highlighting
//!
//! ## Quick Start
//!
//! ```ignore
//! use ulam::{GeoPoint, SessionBuilder};
//!
//! let session = SessionBuilder::new()
//!     .dataset_file("/data/bu-latest.js.gz")
//!     .fallback_file("/data/bu-fallback.js.gz")
//!     .build()?;
//!
//! let pair = session.sample_pair(GeoPoint::new(50.0, -80.0), 2.5);
//! println!("here:     {}", pair.primary.summary());
//! println!("antipode: {}", pair.antipodal.summary());
//! ```
//!
//! ## Dataset Format
//!
//! Datasets are JSON documents, optionally wrapped as `const bu = {...}` and
//! optionally gzip-compressed:
//!
//! - `ds_datetime`: UTC reference epoch
//! - `ulamlist`: `[offset_seconds, [lat, lng]]` snapshots, ascending
//! - `t_initial`, `p_initial`, `t_final`, `p_final`: 450 rows × 900 columns
//!   of Kelvin and Pascal values on a 0.4° grid, row 0 at the north pole

pub mod dataset;
pub mod error;
pub mod geo;
pub mod grid;
pub mod interpolate;
pub mod loader;
pub mod precision;
pub mod selector;
pub mod session;
pub mod sync;

#[cfg(feature = "download")]
pub mod download;

#[cfg(feature = "geojson")]
pub mod geojson;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export main types at crate root for convenience
pub use dataset::{Dataset, RawDataset, Snapshot};
pub use error::{Result, UlamError};
pub use geo::GeoPoint;
pub use grid::{CellLocation, Field, FieldSample, GridSpec, ScalarGrid};
pub use interpolate::{sample_at, Conditions};
pub use loader::{CacheStats, DatasetCache, DatasetSource};
pub use precision::{Highlight, LabelFragments, Precision, SampleResult};
pub use selector::{select_timestep, SelectedTimestep};
pub use session::{
    DatasetOrigin, FallbackProvider, PairedSample, SelectionOutcome, Session, SessionBuilder,
};
pub use sync::{PopupPair, ViewId, ViewState, ViewSynchronizer};
