use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::middleware::AuthUser;
use crate::config::state::AppState;
use crate::database::StoredFile;
use crate::utils::{sanitizer::sanitize_filename, AppError, HandlerResponse};

pub const UPLOAD_FIELD: &str = "file";

const ALLOWED_EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

/// Content type for an allowed file name, `None` for anything else
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension: String = extension.to_ascii_lowercase();

    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, content_type)| *content_type)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".into())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Stores the `file` field of a multipart upload
#[instrument(name = "upload_file", skip(state, caller, multipart), fields(owner = %caller.username))]
pub async fn upload(
    State(state): State<AppState>,
    caller: AuthUser,
    mut multipart: Multipart,
) -> Result<HandlerResponse, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let raw_name: String = field.file_name().unwrap_or_default().to_string();
        let filename: String = sanitize_filename(&raw_name)
            .ok_or_else(|| AppError::BadRequest("A file name is required".into()))?;
        let content_type: &str = content_type_for(&filename).ok_or_else(|| {
            AppError::BadRequest(format!(
                "File type not allowed; allowed extensions: {}",
                ALLOWED_EXTENSIONS.iter().map(|(ext, _)| *ext).collect::<Vec<_>>().join(", ")
            ))
        })?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }

        let stored: StoredFile = state
            .files
            .save(caller.user_id, &filename, content_type, &bytes)
            .await?;

        info!("Stored {} ({} bytes) as {}", stored.filename, stored.size, stored.file_id);

        return Ok(HandlerResponse::new(StatusCode::CREATED)
            .message("File uploaded successfully")
            .data(json!(stored)));
    }

    Err(AppError::BadRequest(format!("Missing multipart field '{UPLOAD_FIELD}'")))
}

/// The caller's uploads, newest first
pub async fn list_files(
    State(state): State<AppState>,
    caller: AuthUser,
) -> HandlerResponse {
    let files: Vec<StoredFile> = state.files.list_for(&caller.user_id);

    HandlerResponse::new(StatusCode::OK)
        .data(json!({ "files": files, "count": files.len() }))
}

/// Raw bytes of one of the caller's uploads
pub async fn download(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(file_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let file: StoredFile = state
        .files
        .get_owned(&file_id, &caller.user_id)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let bytes: Vec<u8> = state.files.read(&file).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
