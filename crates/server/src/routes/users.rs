//! User administration handlers: bulk spreadsheet import.

use std::io::Cursor;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::services::UserImporter;
use crate::state::{AppState, ImportJobStatus};

/// Multipart field carrying the spreadsheet.
const FILE_FIELD: &str = "file";

/// Start a background import from an uploaded CSV file.
///
/// Responds `202 Accepted` with a job id to poll, or `409 Conflict` when an
/// import is already running.
#[instrument(skip(state, multipart))]
pub async fn start_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
            file = Some(bytes.to_vec());
        }
    }
    let file = file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_owned()))?;
    if file.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_owned()));
    }

    // One import at a time; the guard travels into the background task and
    // releases the lock when the run ends.
    let Ok(guard) = state.import_lock().try_lock_owned() else {
        return Err(AppError::Conflict(
            "An import is already in progress".to_owned(),
        ));
    };

    let job_id = Uuid::new_v4();
    state
        .import_jobs()
        .write()
        .await
        .insert(job_id, ImportJobStatus::Running);
    info!(%job_id, bytes = file.len(), "Import job started");

    let task_state = state.clone();
    tokio::spawn(async move {
        let _guard = guard;

        let repo = UserRepository::new(task_state.pool());
        let importer = UserImporter::new(&repo);
        let status = match importer.run(Cursor::new(file)).await {
            Ok(summary) => {
                info!(
                    %job_id,
                    imported = summary.imported,
                    skipped = summary.skipped,
                    errors = summary.error_count,
                    "Import job finished"
                );
                ImportJobStatus::Completed { summary }
            }
            Err(err) => {
                error!(%job_id, error = %err, "Import job failed");
                ImportJobStatus::Failed {
                    message: err.to_string(),
                }
            }
        };

        task_state.import_jobs().write().await.insert(job_id, status);
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

/// Poll the status of an import job.
#[instrument(skip(state))]
pub async fn import_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let jobs = state.import_jobs().read().await;
    let status = jobs
        .get(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("import job {job_id}")))?;

    Ok(Json(json!({ "job_id": job_id, "job": status })))
}
