//! HTTP route handlers for the control API.

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use payctl::guard::RunStatus;
use payctl::launch::LaunchError;
use payctl::tail;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payloads", get(list_payloads))
        .route("/run/{name}", post(run_payload))
        .route("/status", get(status))
        .route("/logs/tail", get(tail_logs))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// GET /api/health - liveness probe, no side effects.
async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Serialize)]
struct PayloadList {
    payloads: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(code: StatusCode, error: String) -> (StatusCode, Json<ErrorBody>) {
    (code, Json(ErrorBody { error }))
}

/// GET /api/payloads - current catalog, read fresh.
async fn list_payloads(
    State(state): State<AppState>,
) -> Result<Json<PayloadList>, (StatusCode, Json<ErrorBody>)> {
    let payloads = state
        .catalog
        .list()
        .map_err(|err| error_response(StatusCode::SERVICE_UNAVAILABLE, format!("{err:#}")))?;
    Ok(Json(PayloadList { payloads }))
}

#[derive(Serialize)]
struct RunResponse {
    status: &'static str,
    payload: String,
}

fn launch_status(err: &LaunchError) -> StatusCode {
    match err {
        LaunchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LaunchError::NotFound(_) => StatusCode::NOT_FOUND,
        LaunchError::Conflict { .. } => StatusCode::CONFLICT,
    }
}

/// POST /api/run/:name - admit and start a payload in the background.
async fn run_payload(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RunResponse>, (StatusCode, Json<ErrorBody>)> {
    let started = state
        .launcher
        .launch(&name)
        .map_err(|err| error_response(launch_status(&err), err.to_string()))?;
    Ok(Json(RunResponse {
        status: "started",
        payload: started.name,
    }))
}

/// GET /api/status - consistent `{running, name}` snapshot.
async fn status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.guard.snapshot())
}

#[derive(Deserialize)]
struct TailQuery {
    #[serde(default)]
    from_start: bool,
}

/// GET /api/logs/tail - unbounded chunked stream of log lines.
///
/// The response body never completes on its own; it flows until the client
/// disconnects, which drops the underlying file handle.
async fn tail_logs(
    State(state): State<AppState>,
    Query(query): Query<TailQuery>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let stream = tail::tail(state.log_file.clone(), query.from_start)
        .await
        .map_err(|err| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("open log for tail: {err}"),
            )
        })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}
