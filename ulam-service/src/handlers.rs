//! HTTP request handlers for the climate sampling service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use geojson::{FeatureCollection, Geometry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulam::geojson::{markers_feature_collection, sample_geometry};
use ulam::{
    DatasetOrigin, GeoPoint, Highlight, PairedSample, SampleResult, SelectedTimestep,
    SelectionOutcome, Session, UlamError,
};
use utoipa::{IntoParams, ToSchema};

use crate::{reload_at, AppState};

/// Zoom used when a request does not name one.
pub const DEFAULT_ZOOM: f64 = 3.0;

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

/// Query parameters for the sample endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SampleQuery {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Map zoom level; controls how many decimals the labels carry.
    #[serde(default = "default_zoom")]
    #[param(default = 3.0)]
    pub zoom: f64,
}

/// Query parameters for the antipode endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AntipodeQuery {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
}

/// Query parameters for the GeoJSON sampling endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ZoomQuery {
    /// Map zoom level.
    #[serde(default = "default_zoom")]
    #[param(default = 3.0)]
    pub zoom: f64,
}

/// Conditions at a point and at its antipode.
#[derive(Debug, Serialize, ToSchema)]
pub struct SampleResponse {
    /// Sample at the requested point.
    #[schema(value_type = Object)]
    pub primary: SampleResult,
    /// Sample at the antipode.
    #[schema(value_type = Object)]
    pub antipodal: SampleResult,
    /// Which displayed values match: `both`, `temperature`, `pressure` or `none`.
    #[schema(value_type = String)]
    pub highlight: Highlight,
    /// Snapshot the fields were blended for.
    #[schema(value_type = Object)]
    pub timestep: SelectedTimestep,
    /// Valid time of the data, to the minute.
    pub last_updated: DateTime<Utc>,
    /// Whether the session is showing the fallback dataset.
    pub degraded: bool,
}

impl SampleResponse {
    fn new(pair: PairedSample, session: &Session) -> Self {
        Self {
            primary: pair.primary,
            antipodal: pair.antipodal,
            highlight: pair.highlight,
            timestep: session.selected(),
            last_updated: session.last_updated(),
            degraded: session.is_degraded(),
        }
    }
}

/// A point and its antipode.
#[derive(Debug, Serialize, ToSchema)]
pub struct AntipodeResponse {
    #[schema(value_type = Object)]
    pub point: GeoPoint,
    #[schema(value_type = Object)]
    pub antipode: GeoPoint,
}

/// The currently selected snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimestepResponse {
    #[schema(value_type = Object)]
    pub timestep: SelectedTimestep,
    /// `primary` or `fallback`.
    #[schema(value_type = String)]
    pub origin: DatasetOrigin,
    pub reference_epoch: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Whether the periodic refresh still moves the selection.
    pub automatic_updates: bool,
    pub degraded: bool,
    /// Outcome of the selection that produced this response, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub outcome: Option<SelectionOutcome>,
}

impl TimestepResponse {
    fn new(session: &Session, outcome: Option<SelectionOutcome>) -> Self {
        Self {
            timestep: session.selected(),
            origin: session.origin(),
            reference_epoch: session.dataset().reference_epoch(),
            last_updated: session.last_updated(),
            automatic_updates: session.automatic_updates(),
            degraded: session.is_degraded(),
            outcome,
        }
    }
}

/// Manual timestep override.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TimestepOverride {
    /// Instant to select the snapshot for (RFC 3339).
    pub at: DateTime<Utc>,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Dataset cache and session statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of datasets in cache.
    pub cached_datasets: u64,
    /// Number of cache hits.
    pub cache_hits: u64,
    /// Number of cache misses.
    pub cache_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
    /// Whether the session is showing the fallback dataset.
    pub degraded: bool,
    /// Whether the periodic refresh still moves the selection.
    pub automatic_updates: bool,
    /// Times the fallback dataset has been requested.
    pub fallback_loads: u64,
}

/// Sample temperature and pressure at a point and its antipode.
#[utoipa::path(
    get,
    path = "/sample",
    params(SampleQuery),
    responses(
        (status = 200, description = "Paired sample", body = SampleResponse),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse)
    ),
    tag = "sampling"
)]
pub async fn get_sample(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SampleQuery>,
) -> impl IntoResponse {
    tracing::debug!(lat = query.lat, lon = query.lon, zoom = query.zoom, "Sample query");

    let point = match GeoPoint::checked(query.lat, query.lon) {
        Ok(point) => point,
        Err(e) => return error_response(e),
    };

    let session = state.session.read().await;
    let pair = session.sample_pair(point, query.zoom);
    tracing::info!(
        lat = query.lat,
        lon = query.lon,
        temperature = %pair.primary.label.temperature,
        pressure = %pair.primary.label.pressure,
        highlight = pair.highlight.as_str(),
        "Sample served"
    );

    (StatusCode::OK, Json(SampleResponse::new(pair, &session))).into_response()
}

/// Sample every vertex of a GeoJSON geometry.
///
/// Returns one point feature per vertex, in traversal order, with
/// temperature and pressure properties.
#[utoipa::path(
    post,
    path = "/sample",
    params(ZoomQuery),
    request_body(content = serde_json::Value, description = "GeoJSON geometry"),
    responses(
        (status = 200, description = "Sampled vertices", body = serde_json::Value),
        (status = 400, description = "Invalid geometry or coordinates", body = ErrorResponse)
    ),
    tag = "sampling"
)]
pub async fn post_sample(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ZoomQuery>,
    Json(geometry): Json<Geometry>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    match sample_geometry(&session, &geometry, query.zoom) {
        Ok(collection) => {
            tracing::info!(vertices = collection.features.len(), "Geometry sampled");
            (StatusCode::OK, Json(collection)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Compute the antipode of a point.
#[utoipa::path(
    get,
    path = "/antipode",
    params(AntipodeQuery),
    responses(
        (status = 200, description = "Point and antipode", body = AntipodeResponse),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse)
    ),
    tag = "sampling"
)]
pub async fn get_antipode(Query(query): Query<AntipodeQuery>) -> impl IntoResponse {
    match GeoPoint::checked(query.lat, query.lon) {
        Ok(point) => (
            StatusCode::OK,
            Json(AntipodeResponse {
                point,
                antipode: point.antipode(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Get the currently selected snapshot.
#[utoipa::path(
    get,
    path = "/timestep",
    responses((status = 200, description = "Selected snapshot", body = TimestepResponse)),
    tag = "timestep"
)]
pub async fn get_timestep(State(state): State<Arc<AppState>>) -> Json<TimestepResponse> {
    let session = state.session.read().await;
    Json(TimestepResponse::new(&session, None))
}

/// Select the snapshot for an arbitrary instant.
///
/// Leaves the automatic refresh flag untouched. May load the fallback
/// dataset if nothing has elapsed at `at`.
#[utoipa::path(
    post,
    path = "/timestep",
    request_body = TimestepOverride,
    responses(
        (status = 200, description = "New selection", body = TimestepResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "timestep"
)]
pub async fn post_timestep(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TimestepOverride>,
) -> impl IntoResponse {
    let at = request.at;
    let result = tokio::task::spawn_blocking(move || {
        let mut session = state.session.blocking_write();
        let outcome = session.select_manually(at);
        TimestepResponse::new(&session, Some(outcome))
    })
    .await;

    match result {
        Ok(response) => {
            tracing::info!(
                at = %at,
                index = response.timestep.index,
                outcome = ?response.outcome,
                "Manual timestep selection"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Manual selection task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Reload the primary dataset.
///
/// Re-enables automatic refresh after a fallback.
#[utoipa::path(
    post,
    path = "/dataset/reload",
    responses(
        (status = 200, description = "Selection on the reloaded dataset", body = TimestepResponse),
        (status = 500, description = "Dataset could not be loaded", body = ErrorResponse)
    ),
    tag = "timestep"
)]
pub async fn post_reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || -> ulam::Result<TimestepResponse> {
        let outcome = reload_at(&state, Utc::now())?;
        let session = state.session.blocking_read();
        Ok(TimestepResponse::new(&session, Some(outcome)))
    })
    .await;

    match result {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            tracing::error!(error = %e, "Reload task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Markers for the selected snapshot point, its antipode and the equator.
#[utoipa::path(
    get,
    path = "/markers",
    responses((status = 200, description = "GeoJSON feature collection", body = serde_json::Value)),
    tag = "timestep"
)]
pub async fn get_markers(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    let session = state.session.read().await;
    Json(markers_feature_collection(&session))
}

/// Create an error response for a failed query.
fn error_response(e: UlamError) -> axum::response::Response {
    let status = match &e {
        UlamError::OutOfBounds { .. } | UlamError::InvalidCoordinate { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::warn!(error = %e, "Query failed");

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get cache and session statistics.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Statistics", body = StatsResponse)),
    tag = "system"
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    let session = state.session.read().await;

    Json(StatsResponse {
        cached_datasets: stats.entry_count,
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        hit_rate: stats.hit_rate(),
        degraded: session.is_degraded(),
        automatic_updates: session.automatic_updates(),
        fallback_loads: session.fallback_loads(),
    })
}
