use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::api::error::{ApiResult, AppError};
use crate::api::state::AppState;
use crate::api::types::*;
use crate::db::{attachment_file_name, CreateAttachment, DbError, TaskAttachment};

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

const FALLBACK_MIME: &str = "application/octet-stream";

pub async fn upload_attachment(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<TaskAttachment>)> {
    state.db.get_task(task_id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(base_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("Uploaded file has no name"))?
            .to_string();
        let mime_type = field.content_type().unwrap_or(FALLBACK_MIME).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Failed to read upload: {}", e)))?;

        upload = Some((original_name, mime_type, bytes));
        break;
    }

    let (original_name, mime_type, bytes) =
        upload.ok_or_else(|| AppError::bad_request("No file uploaded"))?;

    let file_name = attachment_file_name(task_id, &original_name);
    if state.db.get_attachment_by_file_name(&file_name)?.is_some() {
        return Err(AppError::conflict(format!("File {} is already attached", original_name)));
    }
    state.files.write(&file_name, &bytes)?;

    let created = state.db.create_attachment(&CreateAttachment {
        task_id,
        file_name: file_name.clone(),
        file_size: bytes.len() as i64,
        mime_type,
    });

    match created {
        Ok(attachment) => {
            tracing::info!("Stored attachment {} for task {}", attachment.id, task_id);
            Ok((StatusCode::CREATED, Json(attachment)))
        }
        // A conflicting record owns the bytes, so they stay.
        Err(e @ DbError::Conflict(_)) => Err(e.into()),
        Err(e) => {
            if let Err(cleanup) = state.files.delete(&file_name) {
                tracing::warn!("Could not remove orphaned file {}: {}", file_name, cleanup);
            }
            Err(e.into())
        }
    }
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskAttachment>>> {
    let attachments = state.db.get_attachments_by_task(task_id)?;
    Ok(Json(attachments))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .files
        .read(&filename)?
        .ok_or_else(|| AppError::not_found(&format!("File {}", filename)))?;

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, FALLBACK_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// Removes the record, then its stored bytes.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(attachment_id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    let attachment = state.db.delete_attachment(attachment_id)?;
    if let Err(e) = state.files.delete(&attachment.file_name) {
        tracing::warn!("Could not remove file {}: {}", attachment.file_name, e);
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: attachment_id,
    }))
}

/// Last path component of a client-supplied file name.
fn base_name(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name).trim()
}
