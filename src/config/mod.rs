use std::env;
use std::path::PathBuf;

/// Runtime configuration for the OCR backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port (default: 5000)
    pub port: u16,

    /// Intake directory for raw uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Output directory for OCR'd PDFs (default: "processed")
    pub processed_dir: PathBuf,

    /// Pre-built frontend bundle served as the SPA (default: "../frontend/dist")
    pub static_dir: PathBuf,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// OCR engine type: "ocrmypdf" or "passthrough" (default: "ocrmypdf")
    pub ocr_engine: String,

    /// OCR executable (default: "ocrmypdf", resolved through PATH)
    pub ocr_command: String,

    /// Tesseract language passed as `-l` (default: engine default)
    pub ocr_language: Option<String>,

    /// Kill the OCR process after this many seconds, 0 disables (default: 600)
    pub ocr_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            static_dir: PathBuf::from("../frontend/dist"),
            allowed_origins: vec!["https://frontend-brown-ten-56.vercel.app".to_string()],
            max_file_size: 100 * 1024 * 1024, // 100 MB
            ocr_engine: "ocrmypdf".to_string(),
            ocr_command: "ocrmypdf".to_string(),
            ocr_language: None,
            ocr_timeout_secs: 600,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            upload_dir: env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            processed_dir: env::var("PROCESSED_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.processed_dir),

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.static_dir),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().trim_end_matches('/').to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|origins| !origins.is_empty())
                .unwrap_or(default.allowed_origins),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            ocr_engine: env::var("OCR_ENGINE").unwrap_or(default.ocr_engine),

            ocr_command: env::var("OCR_COMMAND").unwrap_or(default.ocr_command),

            ocr_language: env::var("OCR_LANGUAGE")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            ocr_timeout_secs: env::var("OCR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.ocr_timeout_secs),
        }
    }

    /// Create config for development (no real OCR, localhost frontend)
    pub fn development() -> Self {
        Self {
            ocr_engine: "passthrough".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(), // Vite default
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            ..Self::default()
        }
    }
}
