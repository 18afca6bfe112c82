//! The sampling session: active dataset, selected timestep and refresh policy.
//!
//! A [`Session`] owns everything that changes while the engine runs. The
//! active dataset, the selected timestep, the automatic-refresh flag and the
//! fallback bookkeeping live in one private state value that is replaced as a
//! whole on every transition, so a timestep index is never observed together
//! with a dataset it was not selected from.
//!
//! # Fallback
//!
//! When no snapshot of the active dataset has elapsed yet, the session loads
//! a known-good dataset from its [`FallbackProvider`], selects its first
//! snapshot and, for automatic selections, stops refreshing until a new
//! dataset is installed with [`Session::replace_dataset`]. The transition
//! happens once; later failing selections pin index 0 without loading again.
//!
//! # Example
//!
//! ```ignore
//! use ulam::{GeoPoint, SessionBuilder};
//!
//! let mut session = SessionBuilder::new()
//!     .dataset_file("/data/bu-latest.js.gz")
//!     .fallback_file("/data/bu-fallback.js.gz")
//!     .build()?;
//!
//! let pair = session.sample_pair(GeoPoint::new(50.0, -80.0), 3.0);
//! println!("{} / {}", pair.primary.summary(), pair.antipodal.summary());
//!
//! // once a minute
//! session.tick(chrono::Utc::now());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::dataset::Dataset;
use crate::error::{Result, UlamError};
use crate::geo::GeoPoint;
use crate::interpolate;
use crate::loader::{DatasetCache, DatasetSource, SourceFallback};
use crate::precision::{Highlight, SampleResult};
use crate::selector::{first_timestep, select_timestep, SelectedTimestep};
use crate::sync::PopupPair;

#[cfg(feature = "download")]
use crate::download::DownloadConfig;

/// Default number of datasets kept in the loader cache.
pub const DEFAULT_CACHE_SIZE: u64 = 4;

/// Supplies the known-good dataset used when the active one has no elapsed
/// snapshot.
pub trait FallbackProvider: Send + Sync {
    fn load_fallback(&self) -> Result<Arc<Dataset>>;
}

impl<F> FallbackProvider for F
where
    F: Fn() -> Result<Arc<Dataset>> + Send + Sync,
{
    fn load_fallback(&self) -> Result<Arc<Dataset>> {
        self()
    }
}

/// Where the active dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetOrigin {
    /// The dataset the session was started with, or one installed later.
    Primary,
    /// The fallback dataset.
    Fallback,
}

/// What a selection call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// The selected timestep did not change.
    Unchanged,
    /// A different timestep was selected.
    Changed,
    /// Nothing had elapsed and the session switched to fallback mode.
    FellBack,
    /// Automatic refresh is disabled; nothing was done.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Automatic,
    Manual,
}

/// Primary and antipodal samples taken together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedSample {
    pub primary: SampleResult,
    pub antipodal: SampleResult,
    /// Which displayed quantities agree between the two.
    pub highlight: Highlight,
}

#[derive(Debug, Clone)]
struct ActiveState {
    dataset: Arc<Dataset>,
    origin: DatasetOrigin,
    selected: SelectedTimestep,
    automatic_updates: bool,
    fallback_attempted: bool,
}

/// Explicit owner of the engine's mutable state.
pub struct Session {
    state: ActiveState,
    fallback: Option<Arc<dyn FallbackProvider>>,
    fallback_loads: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("has_fallback", &self.fallback.is_some())
            .field("fallback_loads", &self.fallback_loads)
            .finish()
    }
}

impl Session {
    /// Start a session on `dataset` and run the initial selection for `now`.
    ///
    /// The initial selection counts as automatic: if nothing has elapsed the
    /// session falls back and disables automatic refresh.
    pub fn new(
        dataset: Arc<Dataset>,
        fallback: Option<Arc<dyn FallbackProvider>>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            state: ActiveState {
                selected: first_timestep(&dataset),
                dataset,
                origin: DatasetOrigin::Primary,
                automatic_updates: true,
                fallback_attempted: false,
            },
            fallback,
            fallback_loads: 0,
        };
        session.select(now, Trigger::Automatic);
        session
    }

    /// Create a builder configured from code or the environment.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Periodic re-selection. Does nothing once automatic refresh is disabled.
    pub fn tick(&mut self, now: DateTime<Utc>) -> SelectionOutcome {
        if !self.state.automatic_updates {
            debug!("automatic refresh disabled, skipping tick");
            return SelectionOutcome::Skipped;
        }
        self.select(now, Trigger::Automatic)
    }

    /// Select the timestep for an arbitrary instant.
    ///
    /// Follows the same rules as [`Session::tick`], including the fallback,
    /// but never changes the automatic-refresh flag.
    pub fn select_manually(&mut self, at: DateTime<Utc>) -> SelectionOutcome {
        self.select(at, Trigger::Manual)
    }

    /// Install a new dataset and select its timestep for `now`.
    ///
    /// Re-enables automatic refresh and clears any earlier fallback.
    pub fn replace_dataset(&mut self, dataset: Arc<Dataset>, now: DateTime<Utc>) -> SelectionOutcome {
        info!(
            epoch = %dataset.reference_epoch(),
            snapshots = dataset.snapshots().len(),
            "installing dataset"
        );
        self.state = ActiveState {
            selected: first_timestep(&dataset),
            dataset,
            origin: DatasetOrigin::Primary,
            automatic_updates: true,
            fallback_attempted: false,
        };
        match self.select(now, Trigger::Automatic) {
            SelectionOutcome::Unchanged => SelectionOutcome::Changed,
            outcome => outcome,
        }
    }

    fn select(&mut self, now: DateTime<Utc>, trigger: Trigger) -> SelectionOutcome {
        match select_timestep(&self.state.dataset, now) {
            Some(selected) if selected == self.state.selected => SelectionOutcome::Unchanged,
            Some(selected) => {
                debug!(
                    index = selected.index,
                    offset = selected.offset_seconds,
                    "selected timestep"
                );
                self.state = ActiveState {
                    selected,
                    ..self.state.clone()
                };
                SelectionOutcome::Changed
            }
            None => self.fall_back(now, trigger),
        }
    }

    fn fall_back(&mut self, now: DateTime<Utc>, trigger: Trigger) -> SelectionOutcome {
        let automatic_updates = match trigger {
            Trigger::Automatic => false,
            Trigger::Manual => self.state.automatic_updates,
        };

        if self.state.fallback_attempted {
            let selected = first_timestep(&self.state.dataset);
            let outcome = if selected == self.state.selected {
                SelectionOutcome::Unchanged
            } else {
                SelectionOutcome::Changed
            };
            self.state = ActiveState {
                selected,
                automatic_updates,
                ..self.state.clone()
            };
            return outcome;
        }

        warn!(
            now = %now,
            epoch = %self.state.dataset.reference_epoch(),
            "no snapshot has elapsed, switching to the fallback dataset"
        );

        let loaded = match &self.fallback {
            Some(provider) => match provider.load_fallback() {
                Ok(dataset) => Some(dataset),
                Err(e) => {
                    error!(error = %e, "failed to load fallback dataset, keeping current one");
                    None
                }
            },
            None => {
                error!("no fallback dataset configured, keeping current one");
                None
            }
        };

        let (dataset, origin) = match loaded {
            Some(dataset) => {
                self.fallback_loads += 1;
                (dataset, DatasetOrigin::Fallback)
            }
            None => (self.state.dataset.clone(), self.state.origin),
        };

        self.state = ActiveState {
            selected: first_timestep(&dataset),
            dataset,
            origin,
            automatic_updates,
            fallback_attempted: true,
        };
        SelectionOutcome::FellBack
    }

    /// The active dataset.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.state.dataset
    }

    /// Where the active dataset came from.
    pub fn origin(&self) -> DatasetOrigin {
        self.state.origin
    }

    /// The selected timestep of the active dataset.
    pub fn selected(&self) -> SelectedTimestep {
        self.state.selected
    }

    /// Whether [`Session::tick`] re-selects the timestep.
    pub fn automatic_updates(&self) -> bool {
        self.state.automatic_updates
    }

    /// True once the session has fallen back, until a dataset swap.
    pub fn is_degraded(&self) -> bool {
        self.state.fallback_attempted
    }

    /// Number of fallback datasets loaded so far.
    pub fn fallback_loads(&self) -> u64 {
        self.fallback_loads
    }

    /// Representative point of the selected snapshot.
    pub fn current_point(&self) -> GeoPoint {
        self.state.selected.point
    }

    /// The selected snapshot point and its antipode.
    pub fn marker_points(&self) -> (GeoPoint, GeoPoint) {
        let point = self.current_point();
        (point, point.antipode())
    }

    /// Sample the active dataset at `point` for the selected timestep.
    pub fn sample_at(&self, point: GeoPoint, zoom: f64) -> SampleResult {
        interpolate::sample_at(point, &self.state.dataset, &self.state.selected, zoom)
    }

    /// Sample `point` and its antipode, and compare the displayed values.
    pub fn sample_pair(&self, point: GeoPoint, zoom: f64) -> PairedSample {
        let primary = self.sample_at(point, zoom);
        let antipodal = self.sample_at(point.antipode(), zoom);
        let highlight = Highlight::compare(&primary, &antipodal);
        PairedSample {
            primary,
            antipodal,
            highlight,
        }
    }

    /// Sample the two popup positions.
    pub fn sample_popups(&self, popups: &PopupPair, zoom: f64) -> PairedSample {
        self.sample_pair(popups.primary(), zoom)
    }

    /// When the displayed data was valid: reference epoch plus the selected
    /// offset, rounded to the nearest minute (halves round up).
    pub fn last_updated(&self) -> DateTime<Utc> {
        let dataset = &self.state.dataset;
        let instant = dataset
            .instant_at(self.state.selected.offset_seconds)
            .unwrap_or_else(|| dataset.reference_epoch());
        let rounded = (instant.timestamp_millis() + 30_000).div_euclid(60_000) * 60_000;
        DateTime::from_timestamp_millis(rounded).unwrap_or(instant)
    }
}

/// Builder for [`Session`].
///
/// # Example
///
/// ```ignore
/// use ulam::SessionBuilder;
///
/// // ULAM_DATASET=/data/bu.js.gz ULAM_FALLBACK=/data/bu-fallback.js.gz
/// let session = SessionBuilder::from_env()?.build()?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    dataset: Option<DatasetSource>,
    fallback: Option<DatasetSource>,
    cache_size: u64,
    #[cfg(feature = "download")]
    download_config: Option<DownloadConfig>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            dataset: None,
            fallback: None,
            cache_size: DEFAULT_CACHE_SIZE,
            #[cfg(feature = "download")]
            download_config: None,
        }
    }

    /// Create a builder from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `ULAM_DATASET` | dataset file |
    /// | `ULAM_FALLBACK` | fallback dataset file |
    /// | `ULAM_CACHE_SIZE` | datasets kept in the cache (default 4) |
    /// | `ULAM_POINTER_URL` | pointer file URL, used when `ULAM_DATASET` is unset (`download` feature) |
    /// | `ULAM_FALLBACK_URL` | fallback dataset URL, used when `ULAM_FALLBACK` is unset (`download` feature) |
    ///
    /// # Errors
    ///
    /// Returns [`UlamError::MissingConfig`] if no dataset source is set.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        builder.dataset = std::env::var("ULAM_DATASET")
            .ok()
            .map(|path| DatasetSource::File(PathBuf::from(path)));
        builder.fallback = std::env::var("ULAM_FALLBACK")
            .ok()
            .map(|path| DatasetSource::File(PathBuf::from(path)));

        #[cfg(feature = "download")]
        {
            if builder.dataset.is_none() {
                builder.dataset = std::env::var("ULAM_POINTER_URL")
                    .ok()
                    .map(DatasetSource::Pointer);
            }
            if builder.fallback.is_none() {
                builder.fallback = std::env::var("ULAM_FALLBACK_URL")
                    .ok()
                    .map(DatasetSource::Url);
            }
            if builder.has_remote_source() {
                builder.download_config = Some(DownloadConfig::default());
            }
        }

        if builder.dataset.is_none() {
            return Err(UlamError::MissingConfig {
                name: "ULAM_DATASET",
            });
        }

        builder.cache_size = std::env::var("ULAM_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE);

        Ok(builder)
    }

    /// Set the primary dataset source.
    pub fn dataset(mut self, source: DatasetSource) -> Self {
        self.dataset = Some(source);
        self
    }

    /// Use a local file as the primary dataset.
    pub fn dataset_file(self, path: impl Into<PathBuf>) -> Self {
        self.dataset(DatasetSource::File(path.into()))
    }

    /// Set the fallback dataset source.
    pub fn fallback(mut self, source: DatasetSource) -> Self {
        self.fallback = Some(source);
        self
    }

    /// Use a local file as the fallback dataset.
    pub fn fallback_file(self, path: impl Into<PathBuf>) -> Self {
        self.fallback(DatasetSource::File(path.into()))
    }

    /// Set how many decoded datasets the loader cache keeps.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    /// Enable network sources with the given download settings.
    #[cfg(feature = "download")]
    pub fn download(mut self, config: DownloadConfig) -> Self {
        self.download_config = Some(config);
        self
    }

    #[cfg(feature = "download")]
    fn has_remote_source(&self) -> bool {
        self.dataset.iter().chain(self.fallback.iter()).any(DatasetSource::is_remote)
    }

    /// The configured primary dataset source.
    pub fn dataset_source(&self) -> Option<&DatasetSource> {
        self.dataset.as_ref()
    }

    /// The configured fallback dataset source.
    pub fn fallback_source(&self) -> Option<&DatasetSource> {
        self.fallback.as_ref()
    }

    /// Create the dataset cache this builder would load through.
    pub fn build_cache(&self) -> Result<DatasetCache> {
        #[allow(unused_mut)]
        let mut cache = DatasetCache::new(self.cache_size);
        #[cfg(feature = "download")]
        if let Some(config) = &self.download_config {
            cache = cache.with_downloader(crate::download::Downloader::new(config.clone())?);
        }
        Ok(cache)
    }

    /// Load the primary dataset through `cache` and start a session at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if no dataset source is configured or the primary
    /// dataset cannot be loaded. A broken fallback source is not detected
    /// here; it only matters once the session falls back.
    pub fn build_with_cache(
        &self,
        cache: Arc<DatasetCache>,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let source = self.dataset.as_ref().ok_or(UlamError::MissingConfig {
            name: "ULAM_DATASET",
        })?;
        let dataset = cache.load(source)?;
        let fallback = self.fallback.clone().map(|source| {
            Arc::new(SourceFallback::new(cache.clone(), source)) as Arc<dyn FallbackProvider>
        });
        Ok(Session::new(dataset, fallback, now))
    }

    /// Start a session at `now` with a fresh cache.
    pub fn build_at(&self, now: DateTime<Utc>) -> Result<Session> {
        self.build_with_cache(Arc::new(self.build_cache()?), now)
    }

    /// Start a session at the current time.
    pub fn build(&self) -> Result<Session> {
        self.build_at(Utc::now())
    }
}
