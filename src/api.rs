//! HTTP API handlers for AnimAlert.
//!
//! # Endpoints
//!
//! - **GET /health**: liveness check
//! - **GET /geofence**: resolve a point against the zone catalog
//! - **GET /zones**: list the zone catalog
//! - **GET /zones/:id**: one zone of the catalog
//! - **POST /alerts/bear**: manually trigger a bear alert for a sighting
//! - **POST /sync/:job**: run one pass of a sync job now
//!
//! Phone numbers never appear in logs in full.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::NotifyError;
use crate::geofence::GeofenceResolver;
use crate::model::{
    GeofenceQuery, GeofenceResponse, NotifyOptions, NotifyOutcome, NotifyRequest, ZoneSummary,
};
use crate::notify::NotificationDispatcher;
use crate::sync::{SyncRunOutcome, SyncRunner};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: GeofenceResolver,
    pub dispatcher: NotificationDispatcher,
    pub sync_runners: Vec<SyncRunner>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/geofence", get(get_geofence))
        .route("/zones", get(list_zones))
        .route("/zones/:id", get(get_zone))
        .route("/alerts/bear", post(post_bear_alert))
        .route("/sync/:job", post(post_sync_run))
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /geofence - Resolve a point to its zone.
///
/// # Query Parameters
///
/// - `lat`, `lng` (required): point in decimal degrees
///
/// # Response
///
/// ```json
/// {
///     "zone_id": "uat-brasov",
///     "display_name": "Brasov",
///     "distance_km": 0.42,
///     "within_fence": true
/// }
/// ```
///
/// All fields except `within_fence` are null when no zones are configured.
#[instrument(skip(state))]
pub async fn get_geofence(
    State(state): State<AppState>,
    Query(query): Query<GeofenceQuery>,
) -> Json<GeofenceResponse> {
    let response = GeofenceResponse::from(state.resolver.resolve_point(query.lat, query.lng));
    info!(
        zone = response.zone_id.as_deref().unwrap_or("none"),
        within_fence = response.within_fence,
        "Geofence resolved"
    );
    Json(response)
}

/// GET /zones - List the zone catalog in catalog order.
pub async fn list_zones(State(state): State<AppState>) -> Json<Vec<ZoneSummary>> {
    Json(state.resolver.zones().iter().map(ZoneSummary::from).collect())
}

/// GET /zones/:id - One zone, or `404` if the id is not in the catalog.
#[instrument(skip(state))]
pub async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ZoneSummary>, ApiError> {
    state
        .resolver
        .zone(&id)
        .map(|zone| Json(ZoneSummary::from(zone)))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown zone {}", id)))
}

/// POST /alerts/bear - Notify the contacts of the sighting's zone.
///
/// # Request Body
///
/// ```json
/// {
///     "id": "sighting-123",
///     "latitude": 45.656,
///     "longitude": 25.607,
///     "description": "adult bear near the school",
///     "validation_tier": "Tier 2",
///     "force": false
/// }
/// ```
///
/// # Response
///
/// `200` with `{"status": "sent", ...}` or `{"status": "skipped", "id": ...}`.
/// `400` for an invalid payload, `502` when the SMS transport fails.
#[instrument(skip(state, request), fields(sighting_id = %request.payload.id))]
pub async fn post_bear_alert(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<NotifyOutcome>, ApiError> {
    let options = NotifyOptions {
        force: request.force,
    };

    match state.dispatcher.notify(&request.payload, options).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ NotifyError::InvalidPayload(_)) => {
            warn!(error = %e, "Rejected bear alert");
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ NotifyError::Transport { .. }) => {
            warn!(error = %e, "Bear alert delivery failed");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            warn!(error = %e, "Bear alert failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Response for POST /sync/:job.
#[derive(Debug, Serialize)]
pub struct SyncRunResponse {
    pub job: String,
    #[serde(flatten)]
    pub outcome: SyncRunOutcome,
}

/// POST /sync/:job - Run one pass of a sync job now.
///
/// Returns `409` when a pass of that job is already in flight, `404` for an
/// unknown job and `503` when the job's source is not configured.
#[instrument(skip(state))]
pub async fn post_sync_run(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<Json<SyncRunResponse>, ApiError> {
    let runner = state
        .sync_runners
        .iter()
        .find(|r| r.job_name() == job)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown sync job {}", job)))?;

    if !runner.is_configured() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("sync job {} is not configured", job),
        ));
    }

    let outcome = runner.run_once().await;
    if outcome == SyncRunOutcome::Skipped {
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("sync job {} is already running", job),
        ));
    }

    Ok(Json(SyncRunResponse { job, outcome }))
}
