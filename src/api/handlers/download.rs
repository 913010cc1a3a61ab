use crate::AppState;
use crate::api::error::AppError;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio_util::io::ReaderStream;

pub const FILE_NOT_FOUND: &str = "File not found";

/// `(content-type, content-disposition)` for sending `filename` as an attachment
pub(crate) fn attachment_headers(filename: &str) -> (String, String) {
    let content_type = if filename.to_lowercase().ends_with(".pdf") {
        mime::APPLICATION_PDF
    } else {
        mime::APPLICATION_OCTET_STREAM
    };

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    (
        content_type.to_string(),
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback_filename, encoded_filename
        ),
    )
}

#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(
        ("filename" = String, Path, description = "Name of a processed file, as returned in file_url")
    ),
    responses(
        (status = 200, description = "Processed PDF as an attachment"),
        (status = 404, description = "File not found")
    ),
    tag = "ocr"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .storage
        .resolve_processed(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound(FILE_NOT_FOUND.to_string()))?;

    let file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();
    let (content_type, content_disposition) = attachment_headers(&filename);

    tracing::info!("📎 Download {} ({} bytes)", filename, size);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Server(e.to_string()))
}
