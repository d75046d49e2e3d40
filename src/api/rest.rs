use crate::api::error::{ApiError, ApiResult};
use crate::api::types::*;
use crate::coordinator::{QueueStats, UploadCoordinator};
use crate::session::SessionStats;
use crate::store::{FileRecord, UploadSession};
use crate::validation::SelectedFile;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

pub struct RestApi {
    coordinator: Arc<UploadCoordinator>,
}

impl RestApi {
    pub fn new(coordinator: UploadCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/v1/files", get(list_files).post(add_files))
            .route("/api/v1/files/start-all", post(start_all))
            .route("/api/v1/files/clear-completed", post(clear_completed))
            .route("/api/v1/files/:id", get(get_file).delete(remove_file))
            .route("/api/v1/files/:id/upload", post(start_upload))
            .route("/api/v1/files/:id/pause", post(pause_upload))
            .route("/api/v1/files/:id/resume", post(resume_upload))
            .route("/api/v1/files/:id/cancel", post(cancel_upload))
            .route("/api/v1/stats", get(get_stats))
            .route("/api/v1/sessions", get(list_sessions))
            .route("/api/v1/sessions/current", get(current_session))
            .route("/api/v1/sessions/:id/stats", get(session_stats))
            .route("/api/v1/sessions/:id/complete", post(complete_session))
            .route("/api/v1/sessions/:id/cancel", post(cancel_session))
            .with_state(self.coordinator.clone())
    }
}

type AppState = State<Arc<UploadCoordinator>>;

async fn health_check() -> &'static str {
    "OK"
}

async fn list_files(State(coordinator): AppState) -> Json<Vec<FileRecord>> {
    Json(coordinator.files().get_all().await)
}

async fn add_files(
    State(coordinator): AppState,
    Json(req): Json<AddFilesRequest>,
) -> ApiResult<(StatusCode, Json<AddFilesResponse>)> {
    if req.files.is_empty() {
        return Err(ApiError::InvalidRequest("No files selected".to_string()));
    }

    let selection = req
        .files
        .into_iter()
        .map(|f| match f.content {
            Some(encoded) => {
                let content = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    ApiError::InvalidRequest(format!("Invalid content for {}: {e}", f.name))
                })?;
                // Declared size wins so metadata-only clients stay consistent
                let mut file = SelectedFile::new(f.name, f.mime_type, content);
                file.size = f.size;
                Ok(file)
            }
            None => Ok(SelectedFile::described(f.name, f.size, f.mime_type)),
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let report = coordinator.add_files(selection).await?;
    if report.is_empty() {
        return Err(ApiError::Validation(
            report.rejected.iter().map(|e| e.to_string()).collect(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(AddFilesResponse {
            rejected: report.rejected.iter().map(RejectedFile::from).collect(),
            added: report.added,
            session: report.session,
        }),
    ))
}

async fn get_file(State(coordinator): AppState, Path(id): Path<String>) -> ApiResult<Json<FileRecord>> {
    coordinator
        .files()
        .get_by_id(&id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(format!("File {id}")))
}

async fn remove_file(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<FileRecord>> {
    Ok(Json(coordinator.remove(&id).await?))
}

async fn start_upload(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StartUploadResponse>)> {
    coordinator.start_upload(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartUploadResponse {
            message: format!("Upload started for {id}"),
            file_id: id,
        }),
    ))
}

async fn resume_upload(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StartUploadResponse>)> {
    coordinator.resume(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartUploadResponse {
            message: format!("Upload resumed for {id}"),
            file_id: id,
        }),
    ))
}

async fn pause_upload(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<PauseResponse>> {
    let file = coordinator.pause(&id).await?;
    Ok(Json(PauseResponse {
        paused: file.is_some(),
        file,
    }))
}

async fn cancel_upload(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<FileRecord>> {
    Ok(Json(coordinator.cancel(&id).await?))
}

async fn start_all(State(coordinator): AppState) -> Json<StartAllResponse> {
    let started = coordinator.start_all().await;
    Json(StartAllResponse {
        count: started.len(),
        started,
    })
}

async fn clear_completed(State(coordinator): AppState) -> Json<ClearCompletedResponse> {
    Json(ClearCompletedResponse {
        remaining: coordinator.clear_completed().await,
    })
}

async fn get_stats(State(coordinator): AppState) -> Json<QueueStats> {
    Json(coordinator.stats().await)
}

async fn list_sessions(State(coordinator): AppState) -> Json<Vec<UploadSession>> {
    Json(coordinator.sessions().get_all().await)
}

async fn current_session(State(coordinator): AppState) -> ApiResult<Json<UploadSession>> {
    coordinator
        .sessions()
        .current_session()
        .map(Json)
        .ok_or(ApiError::NotFound("Current session".to_string()))
}

async fn session_stats(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionStats>> {
    coordinator
        .sessions()
        .get_session_stats(&id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(format!("Session {id}")))
}

async fn complete_session(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<UploadSession>> {
    let session = coordinator
        .sessions()
        .complete_session(&id)
        .await
        .map_err(|e| ApiError::Coordinator(e.into()))?;
    Ok(Json(session))
}

async fn cancel_session(
    State(coordinator): AppState,
    Path(id): Path<String>,
) -> ApiResult<Json<UploadSession>> {
    let session = coordinator
        .sessions()
        .cancel_session(&id)
        .await
        .map_err(|e| ApiError::Coordinator(e.into()))?;
    Ok(Json(session))
}
