use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clipharvest::download::{AdditionalMetadata, DownloadMetrics};
use clipharvest::{CancelOutcome, Job, JobStatus, QueueStats};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::ApiError;
use crate::state::{AppState, UsageAction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub source_url: String,
    /// Download inline instead of queueing. Only honored when the server
    /// runs with `debug_sync`.
    #[serde(default)]
    pub sync: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDownloadResponse {
    /// Base64 of the rendition bytes.
    pub video_data: String,
    pub metrics: DownloadMetrics,
    pub additional_metadata: AdditionalMetadata,
}

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

pub async fn submit_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    if !request.sync {
        let job_id = state.queue.submit(&request.source_url)?;
        return Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id })).into_response());
    }

    if !state.config.server.debug_sync {
        return Err(ApiError::validation(
            "synchronous downloads are disabled on this server",
        ));
    }
    let source_url = request.source_url.trim();
    if source_url.is_empty() {
        return Err(ApiError::validation("source URL must not be empty"));
    }
    state
        .usage
        .check(UsageAction::SyncDownload)
        .map_err(ApiError::usage_denied)?;

    let span = tracing::info_span!("download.sync");
    let outcome = state
        .downloader
        .download(source_url)
        .instrument(span)
        .await?;

    Ok(Json(SyncDownloadResponse {
        video_data: BASE64.encode(&outcome.video_data),
        metrics: outcome.metrics,
        additional_metadata: outcome.metadata,
    })
    .into_response())
}

pub async fn list_active_jobs(State(state): State<AppState>) -> Json<JobList> {
    Json(JobList {
        jobs: state.queue.get_active_jobs(),
    })
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .queue
        .get_job(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job not found: {}", id)))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let response = match state.queue.request_cancel(&id)? {
        CancelOutcome::Requested => CancelResponse {
            cancelled: true,
            status: None,
        },
        CancelOutcome::AlreadyTerminal(status) => CancelResponse {
            cancelled: false,
            status: Some(status),
        },
    };
    Ok(Json(response))
}

pub async fn queue_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.queue.get_stats())
}
