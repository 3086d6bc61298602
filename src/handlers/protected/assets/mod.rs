// handlers/protected/assets/mod.rs - Asset catalogue handlers
//
// Every handler here acts as the Identity the middleware resolved; the
// catalogue service enforces ownership.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

use crate::error::ApiError;
use crate::services::{AssetForm, Upload};

pub mod file; // GET /api/assets/:id/file, /api/assets/:id/file-preview
pub mod list; // GET /api/assets
pub mod record; // POST /api/assets, GET|PUT|DELETE /api/assets/:id

pub use file::{file_get, file_preview_get};
pub use list::list_get;
pub use record::{create_post, record_delete, record_get, record_put};

/// Collect the multipart create/update form. Unknown fields are ignored.
pub async fn read_asset_form(mut multipart: Multipart) -> Result<AssetForm, ApiError> {
    let mut form = AssetForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(Upload::new(filename, content.to_vec()));
            }
            "name" => form.name = Some(field.text().await.map_err(multipart_error)?),
            "category" => form.category = Some(field.text().await.map_err(multipart_error)?),
            "license_type" => form.license_type = Some(field.text().await.map_err(multipart_error)?),
            "source_url" => form.source_url = Some(field.text().await.map_err(multipart_error)?),
            "description" => form.description = Some(field.text().await.map_err(multipart_error)?),
            "tags" => form.tags = Some(field.text().await.map_err(multipart_error)?),
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the maximum request size")
    } else {
        ApiError::bad_request(format!("Invalid multipart form: {}", err.body_text()))
    }
}
