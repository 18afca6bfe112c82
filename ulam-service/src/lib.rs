//! Ulam Service Library
//!
//! HTTP handlers, shared state and the periodic refresh for the antipodal
//! climate service. Used by both the ulam-service binary and integration
//! tests.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use ulam::{DatasetCache, DatasetSource, SelectionOutcome, Session};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Default interval between automatic timestep refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers.
pub struct AppState {
    /// The single owner of the selected dataset and timestep.
    pub session: RwLock<Session>,
    /// Cache the session loads its datasets through.
    pub cache: Arc<DatasetCache>,
    /// Where the primary dataset is reloaded from.
    pub source: DatasetSource,
}

impl AppState {
    pub fn new(session: Session, cache: Arc<DatasetCache>, source: DatasetSource) -> Self {
        Self {
            session: RwLock::new(session),
            cache,
            source,
        }
    }
}

/// OpenAPI documentation for the Ulam service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ulam Antipodal Climate Service",
        version = "0.1.0",
        description = "REST API for temperature and pressure at a point and its antipode.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "Pedro Sanz Martinez")
    ),
    paths(
        handlers::get_sample,
        handlers::post_sample,
        handlers::get_antipode,
        handlers::get_timestep,
        handlers::post_timestep,
        handlers::post_reload,
        handlers::get_markers,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::SampleResponse,
            handlers::AntipodeResponse,
            handlers::TimestepResponse,
            handlers::TimestepOverride,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "sampling", description = "Point and antipode sampling"),
        (name = "timestep", description = "Snapshot selection and markers"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the service router with docs, tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/sample",
            get(handlers::get_sample).post(handlers::post_sample),
        )
        .route("/antipode", get(handlers::get_antipode))
        .route(
            "/timestep",
            get(handlers::get_timestep).post(handlers::post_timestep),
        )
        .route("/dataset/reload", post(handlers::post_reload))
        .route("/markers", get(handlers::get_markers))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

/// Run one automatic refresh at `now`.
///
/// Holds the write lock for the whole tick, so ticks never overlap with each
/// other or with a manual selection. Blocks while a fallback dataset loads;
/// call it from a blocking context.
pub fn refresh_at(state: &AppState, now: DateTime<Utc>) -> SelectionOutcome {
    let mut session = state.session.blocking_write();
    let outcome = session.tick(now);
    let selected = session.selected();

    match outcome {
        SelectionOutcome::Changed => tracing::info!(
            index = selected.index,
            offset_seconds = selected.offset_seconds,
            "Timestep advanced"
        ),
        SelectionOutcome::FellBack => tracing::warn!(
            index = selected.index,
            fallback_loads = session.fallback_loads(),
            "No snapshot has elapsed, automatic refresh stopped"
        ),
        SelectionOutcome::Unchanged | SelectionOutcome::Skipped => {
            tracing::debug!(outcome = ?outcome, index = selected.index, "Refresh tick")
        }
    }
    outcome
}

/// Reload the primary dataset and install it at `now`.
///
/// Drops the cached copy first so a changed file or pointer is picked up.
/// The load runs before the write lock is taken. Installing the dataset
/// re-enables automatic refresh and leaves fallback mode. Blocking; call it
/// from a blocking context.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded; the session is left
/// untouched.
pub fn reload_at(state: &AppState, now: DateTime<Utc>) -> ulam::Result<SelectionOutcome> {
    state.cache.invalidate(&state.source);
    let dataset = state.cache.load(&state.source)?;

    let mut session = state.session.blocking_write();
    let outcome = session.replace_dataset(dataset, now);
    tracing::info!(
        source = %state.source,
        reference_epoch = %session.dataset().reference_epoch(),
        index = session.selected().index,
        "Dataset reloaded, automatic refresh resumed"
    );
    Ok(outcome)
}

/// Spawn the periodic refresh task.
///
/// The first tick fires one `period` after spawning; the session already
/// selected a timestep when it was built.
pub fn spawn_refresh(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let state = state.clone();
            if let Err(e) =
                tokio::task::spawn_blocking(move || refresh_at(&state, Utc::now())).await
            {
                tracing::error!(error = %e, "Refresh task failed");
            }
        }
    })
}

// Re-export commonly used types for convenience
pub use handlers::{
    AntipodeResponse, ErrorResponse, HealthResponse, SampleQuery, SampleResponse, StatsResponse,
    TimestepOverride, TimestepResponse,
};
