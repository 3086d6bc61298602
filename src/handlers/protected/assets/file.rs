// handlers/protected/assets/file.rs - File download and preview handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::storage::StoredFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

/// GET /api/assets/:id/file - Download the asset's file under the name it
/// was uploaded with
pub async fn file_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let file = state.catalogue.file(&identity, id).await?;
    Ok(file_response(file, Disposition::Attachment))
}

/// GET /api/assets/:id/file-preview - Same file, for display in the browser
pub async fn file_preview_get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let file = state.catalogue.file(&identity, id).await?;
    Ok(file_response(file, Disposition::Inline))
}

fn file_response(file: StoredFile, disposition: Disposition) -> Response {
    let mime = mime_guess::from_path(&file.original_name).first_or_octet_stream();
    let filename = header_safe_filename(&file.original_name);
    let disposition = match disposition {
        Disposition::Attachment => format!("attachment; filename=\"{}\"", filename),
        Disposition::Inline => format!("inline; filename=\"{}\"", filename),
    };

    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (header::CONTENT_LENGTH, file.len.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    (headers, Body::from_stream(file.stream)).into_response()
}

/// Quoted-string form of a filename; characters a header value cannot
/// carry are replaced.
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
