//! # API REST
//!
//! REST read model for the emergency department queue.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON wire shapes, CORS, error status codes)
//!
//! All queue semantics live in `edq-core`; handlers only translate.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use edq_core::{Patient, QueueError, QueueService, QueueStats, SortKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueueService>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct QueuePositionRes {
    pub global: u32,
    pub category: u32,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRes {
    /// One of `registered`, `triaged`, `investigations_pending`, `treatment`,
    /// `admitted`, `discharged`.
    pub current_phase: String,
    /// Test kind (`labs`, `imaging`) to state (`ordered`, `pending`, `reported`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investigations: Option<BTreeMap<String, String>>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRes {
    pub id: String,
    pub triage_category: u8,
    #[schema(value_type = String)]
    pub arrival_time: DateTime<Utc>,
    /// Whole minutes since arrival at the time of the request.
    pub time_elapsed: i64,
    pub status: StatusRes,
    pub queue_position: QueuePositionRes,
}

impl PatientRes {
    fn from_patient(patient: &Patient, now: DateTime<Utc>) -> Self {
        Self {
            id: patient.id.to_string(),
            triage_category: patient.triage_category.get(),
            arrival_time: patient.arrival_time,
            time_elapsed: patient.time_elapsed(now),
            status: StatusRes {
                current_phase: patient.phase().as_str().to_string(),
                investigations: patient.status.investigations.as_ref().map(|tests| {
                    tests
                        .iter()
                        .map(|(kind, state)| (kind.as_str().to_string(), state.as_str().to_string()))
                        .collect()
                }),
            },
            queue_position: QueuePositionRes {
                global: patient.queue_position.global,
                category: patient.queue_position.category,
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueRes {
    pub waiting_count: usize,
    /// Longest current wait in minutes.
    pub longest_wait_time: i64,
    pub patients: Vec<PatientRes>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsRes {
    /// Triage category ("1".."5") to patient count.
    pub category_breakdown: BTreeMap<String, usize>,
    /// Triage category ("1".."5") to mean wait in minutes.
    pub average_wait_times: BTreeMap<String, i64>,
}

impl From<QueueStats> for StatsRes {
    fn from(stats: QueueStats) -> Self {
        Self {
            category_breakdown: stats
                .category_breakdown
                .into_iter()
                .map(|(c, n)| (c.to_string(), n))
                .collect(),
            average_wait_times: stats
                .average_wait_minutes
                .into_iter()
                .map(|(c, m)| (c.to_string(), m))
                .collect(),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueueQuery {
    /// `id`, `triage_category`, `arrival_time` (default), `queue_position`,
    /// `time_elapsed` or `status`.
    pub sort: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorRes>);

fn error_response(context: &str, err: QueueError) -> ApiError {
    let (status, message) = match err {
        QueueError::NotFound(_) => (StatusCode::NOT_FOUND, "Patient not found".to_string()),
        QueueError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            tracing::error!("{context} error: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    };
    (status, Json(ErrorRes { error: message }))
}

#[derive(OpenApi)]
#[openapi(
    paths(health, get_queue, get_patient, get_stats),
    components(schemas(
        HealthRes,
        ErrorRes,
        QueueRes,
        PatientRes,
        StatusRes,
        QueuePositionRes,
        StatsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/queue", get(get_queue))
        .route("/api/v1/patient/:id", get(get_patient))
        .route("/api/v1/stats/current", get(get_stats))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "EDQ REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/queue",
    params(QueueQuery),
    responses(
        (status = 200, description = "Current queue", body = QueueRes),
        (status = 400, description = "Unknown sort key", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Current queue
///
/// Brings the simulation up to date (running an update pass if an interval has elapsed,
/// seeding an empty queue) and returns every live patient.
///
/// # Errors
/// Returns `400 Bad Request` for an unknown sort key and `500 Internal Server Error` if the
/// store cannot be read or written.
#[axum::debug_handler]
async fn get_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<QueueRes>, ApiError> {
    let sort = match query.sort.as_deref() {
        Some(key) => key.parse::<SortKey>().map_err(|e| error_response("Queue", e))?,
        None => SortKey::default(),
    };

    let snapshot = state
        .service
        .queue(Utc::now(), sort)
        .map_err(|e| error_response("Queue", e))?;

    Ok(Json(QueueRes {
        waiting_count: snapshot.waiting_count,
        longest_wait_time: snapshot.longest_wait_minutes,
        patients: snapshot
            .patients
            .iter()
            .map(|p| PatientRes::from_patient(p, snapshot.as_of))
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/patient/{id}",
    params(("id" = String, Path, description = "Patient id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "Patient", body = PatientRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Single patient lookup. Does not advance the simulation.
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let now = Utc::now();
    let patient = state
        .service
        .patient(&id, now)
        .map_err(|e| error_response("Patient lookup", e))?;
    Ok(Json(PatientRes::from_patient(&patient, now)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stats/current",
    responses(
        (status = 200, description = "Category breakdown of a generated sample", body = StatsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Category statistics
///
/// Computed over a freshly generated sample population rather than the live queue, so
/// consecutive calls differ.
#[axum::debug_handler]
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsRes>, ApiError> {
    let stats = state
        .service
        .stats(Utc::now())
        .map_err(|e| error_response("Stats", e))?;
    Ok(Json(stats.into()))
}
