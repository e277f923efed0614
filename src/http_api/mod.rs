//! REST surface for the integration points the surrounding application
//! drives: deletion requests, assignments, unassigned blocks and monthly
//! reports.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::assignment::{Assignment, AssignmentError, AssignmentRequest, DeleteRequest};
use crate::error::PlannerError;
use crate::holiday::HolidayProvider;
use crate::planner::Planner;
use crate::report::MonthReportDataPoint;
use crate::store::SeriesStore;

pub struct AppState<S, H> {
    planner: Arc<Planner<S, H>>,
}

impl<S, H> Clone for AppState<S, H> {
    fn clone(&self) -> Self {
        Self {
            planner: self.planner.clone(),
        }
    }
}

impl<S, H> AppState<S, H> {
    pub fn new(planner: Planner<S, H>) -> Self {
        Self {
            planner: Arc::new(planner),
        }
    }

    pub fn with_shared(planner: Arc<Planner<S, H>>) -> Self {
        Self { planner }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    Internal(String),
}

impl From<AssignmentError> for ApiError {
    fn from(value: AssignmentError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::Assignment(err) => ApiError::Invalid(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UnassignedProjectPayload {
    project: String,
    from: NaiveDate,
    to: NaiveDate,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    color: String,
}

pub fn router<S, H>(state: AppState<S, H>) -> Router
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/employees", get(list_employees))
        .route("/projects", get(list_projects))
        .route("/projects/assign", post(assign_projects))
        .route("/projects/delete", post(delete_project))
        .route("/unassigned-projects", get(list_unassigned).post(create_unassigned))
        .route("/reports", post(enter_report))
        .with_state(state)
}

pub async fn serve<S, H>(addr: SocketAddr, planner: Planner<S, H>) -> std::io::Result<()>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    let state = AppState::new(planner);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_employees<S, H>(
    State(state): State<AppState<S, H>>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    Ok(Json(state.planner.known_employees()?))
}

async fn list_projects<S, H>(
    State(state): State<AppState<S, H>>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    Ok(Json(state.planner.known_projects()?))
}

async fn list_unassigned<S, H>(
    State(state): State<AppState<S, H>>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    Ok(Json(state.planner.known_unassigned_projects()?))
}

async fn assign_projects<S, H>(
    State(state): State<AppState<S, H>>,
    Json(payload): Json<Vec<AssignmentRequest>>,
) -> Result<Response, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    let assignments = payload
        .into_iter()
        .map(Assignment::from_assignment_request)
        .collect::<Result<Vec<_>, _>>()?;
    let written = state.planner.assign_projects(&assignments)?;
    Ok((StatusCode::CREATED, Json(json!({ "records": written }))).into_response())
}

async fn delete_project<S, H>(
    State(state): State<AppState<S, H>>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    info!(
        employee = request.employee,
        project = request.project,
        "deletion requested"
    );
    let deleted = state.planner.delete(&request)?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn create_unassigned<S, H>(
    State(state): State<AppState<S, H>>,
    Json(payload): Json<UnassignedProjectPayload>,
) -> Result<Response, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    let index = state.planner.create_unassigned_project(
        &payload.project,
        payload.from,
        payload.to,
        &payload.notes,
        &payload.color,
    )?;
    Ok((StatusCode::CREATED, Json(json!({ "index": index }))).into_response())
}

async fn enter_report<S, H>(
    State(state): State<AppState<S, H>>,
    Json(actual): Json<MonthReportDataPoint>,
) -> Result<Response, ApiError>
where
    S: SeriesStore + Send + Sync + 'static,
    H: HolidayProvider + Send + Sync + 'static,
{
    state.planner.enter_month_report(&actual)?;
    Ok(StatusCode::CREATED.into_response())
}
