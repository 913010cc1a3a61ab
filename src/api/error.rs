use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub const OCR_FAILED_MESSAGE: &str = "OCR processing failed";

/// True if `err` or any of its sources is the request body limit tripping
pub fn is_body_limit_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().contains("length limit exceeded") {
            return true;
        }
        // io::Error::source() skips the wrapped error, so look inside explicitly
        if let Some(inner) = e
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
        {
            if is_body_limit_error(inner) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// OCR or text extraction produced nothing usable. Details stay in the logs.
    #[error("OCR processing failed")]
    OcrFailed,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0:#}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::OcrFailed
            | AppError::Server(_)
            | AppError::Io(_)
            | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Io(e) => tracing::error!("I/O error: {:?}", e),
            AppError::Anyhow(e) => tracing::error!("Anyhow error: {:?}", e),
            AppError::Server(msg) => tracing::error!("Server error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
