use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{
    DoneResponse, JobStatus, TaskAssignment, TaskCompleteRequest, TaskCompleteResponse,
    TaskFailedRequest, TaskFailedResponse, TaskId, TaskRequest, PROTOCOL_VERSION,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::ledger::Completion;
use crate::state::{AppState, LedgerPoisoned};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/request", post(request_task))
        .route("/api/v1/tasks/complete", post(complete_task))
        .route("/api/v1/tasks/failed", post(fail_task))
        .route("/api/v1/job", get(job_status))
        .route("/api/v1/job/done", get(job_done))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn internal(err: LedgerPoisoned) -> StatusCode {
    error!("{}", err);
    StatusCode::INTERNAL_SERVER_ERROR
}

/* ---------------- HTTP handlers ---------------- */

async fn health() -> &'static str {
    "ok"
}

// RequestTask: next task of the current phase, Wait or Exit
async fn request_task(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<TaskAssignment>, StatusCode> {
    if req.protocol_version != PROTOCOL_VERSION {
        warn!(
            "rejecting task request from {} with protocol version {} (expected {})",
            req.worker_id, req.protocol_version, PROTOCOL_VERSION
        );
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.worker_id.trim().is_empty() {
        warn!("rejecting task request without worker id");
        return Err(StatusCode::BAD_REQUEST);
    }

    let assignment = state.ledger.next_task(&req.worker_id).map_err(internal)?;
    Ok(Json(assignment))
}

// ReportTaskDone
async fn complete_task(
    State(state): State<AppState>,
    Json(req): Json<TaskCompleteRequest>,
) -> Result<Json<TaskCompleteResponse>, StatusCode> {
    let id = TaskId {
        kind: req.kind,
        index: req.task_index,
    };
    let completion = state.ledger.mark_done(id, &req.worker_id).map_err(internal)?;

    Ok(Json(TaskCompleteResponse {
        accepted: completion == Completion::Accepted,
    }))
}

// Worker could not finish the task (I/O or callback error)
async fn fail_task(
    State(state): State<AppState>,
    Json(req): Json<TaskFailedRequest>,
) -> Result<Json<TaskFailedResponse>, StatusCode> {
    let id = TaskId {
        kind: req.kind,
        index: req.task_index,
    };
    warn!("worker {} reports {} failed: {}", req.worker_id, id, req.reason);
    let released = state.ledger.mark_failed(id, &req.worker_id).map_err(internal)?;

    Ok(Json(TaskFailedResponse { released }))
}

async fn job_done(State(state): State<AppState>) -> Result<Json<DoneResponse>, StatusCode> {
    let done = state.ledger.is_done().map_err(internal)?;
    Ok(Json(DoneResponse { done }))
}

async fn job_status(State(state): State<AppState>) -> Result<Json<JobStatus>, StatusCode> {
    let status = state.ledger.status().map_err(internal)?;
    Ok(Json(status))
}
