use crate::config::AppConfig;
use crate::services::ocr::{OcrEngine, create_engine};
use std::sync::Arc;
use tracing::info;

pub async fn setup_ocr_engine(config: &AppConfig) -> Arc<dyn OcrEngine> {
    let engine = create_engine(config);

    if engine.health_check().await {
        info!("🔍 OCR engine '{}' is available", engine.name());
    } else {
        tracing::warn!(
            "⚠️  OCR engine '{}' is not runnable ({}). Uploads will fail until it is installed.",
            engine.name(),
            config.ocr_command
        );
    }

    engine
}
