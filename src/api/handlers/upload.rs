use crate::AppState;
use crate::api::error::{AppError, is_body_limit_error};
use crate::utils::validation::{sanitize_upload_filename, validate_upload_filename};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError, multipart::MultipartRejection},
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

pub const NO_FILE_PART: &str = "No file part";
pub const SUCCESS_MESSAGE: &str = "File processed successfully";

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// Relative URL of the searchable PDF
    pub file_url: String,
    /// Text layer of the OCR'd document, one `\n` after each page
    pub text: String,
}

/// Multipart body accepted by `/upload`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if is_body_limit_error(&e) {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        tracing::debug!("Malformed multipart body: {}", e);
        AppError::BadRequest(NO_FILE_PART.to_string())
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File processed successfully", body = UploadResponse),
        (status = 400, description = "Missing file part, empty filename or non-PDF file"),
        (status = 413, description = "Upload exceeds the size limit"),
        (status = 500, description = "OCR processing failed or server error")
    ),
    tag = "ocr"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Upload without a multipart body: {}", e);
        AppError::BadRequest(NO_FILE_PART.to_string())
    })?;

    let result: Result<Json<UploadResponse>, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some("file") {
                continue;
            }
            // A `file` value without a filename is a plain form field, not a file part
            let Some(original_filename) = field.file_name().map(str::to_string) else {
                continue;
            };

            validate_upload_filename(&original_filename)
                .map_err(|e| AppError::BadRequest(e.message))?;
            let filename = sanitize_upload_filename(&original_filename)
                .map_err(|e| AppError::BadRequest(e.message))?;

            let reader = StreamReader::new(field.map_err(std::io::Error::other));
            let processed = state
                .ocr_service
                .process_upload(&original_filename, &filename, Box::new(reader))
                .await?;

            return Ok(Json(UploadResponse {
                message: SUCCESS_MESSAGE.to_string(),
                file_url: processed.download_url(),
                text: processed.text,
            }));
        }

        Err(AppError::BadRequest(NO_FILE_PART.to_string()))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain the rest of the body so the client is not met with a connection reset
            tracing::warn!("Upload failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}
