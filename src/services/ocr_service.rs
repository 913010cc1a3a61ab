use crate::api::error::{AppError, is_body_limit_error};
use crate::services::extractor::TextExtractor;
use crate::services::ocr::{OcrEngine, OcrOutcome, ocr_output_name};
use crate::services::storage::{StorageService, StoredUpload};
use crate::utils::keyed_mutex::KeyedMutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// A searchable PDF produced by the OCR engine, plus its text layer
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub filename: String,
    pub path: PathBuf,
    pub text: String,
}

impl ProcessedFile {
    pub fn download_url(&self) -> String {
        format!("/download/{}", self.filename)
    }
}

/// Upload pipeline: intake write, OCR, text extraction.
pub struct OcrService {
    storage: Arc<dyn StorageService>,
    engine: Arc<dyn OcrEngine>,
    extractor: Arc<dyn TextExtractor>,
    locks: KeyedMutex,
}

impl OcrService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        engine: Arc<dyn OcrEngine>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            storage,
            engine,
            extractor,
            locks: KeyedMutex::new(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Stores an already validated and sanitized upload and runs it through OCR.
    ///
    /// Uploads sharing a sanitized name are processed one at a time so they
    /// cannot interleave writes to the same intake and output files.
    pub async fn process_upload<'a>(
        &self,
        original_filename: &str,
        filename: &str,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<ProcessedFile, AppError> {
        let guard = self.locks.lock(filename).await;

        let result = async {
            let stored = self
                .storage
                .save_upload(original_filename, filename, reader)
                .await
                .map_err(intake_error)?;
            self.process(&stored).await
        }
        .await;

        drop(guard);
        self.locks.cleanup();
        result
    }

    /// OCR and extraction for a file already in intake storage.
    ///
    /// Every failure past this point collapses into [`AppError::OcrFailed`];
    /// the cause is logged only.
    pub async fn process(&self, stored: &StoredUpload) -> Result<ProcessedFile, AppError> {
        let output_name = ocr_output_name(&stored.filename);
        let output_path = self
            .storage
            .processed_path(&output_name)
            .await
            .map_err(|e| {
                tracing::error!("Cannot prepare processed storage: {:#}", e);
                AppError::OcrFailed
            })?;

        match self.engine.process(&stored.path, &output_path).await {
            Ok(OcrOutcome::Completed) => {}
            Ok(OcrOutcome::Failed { reason }) => {
                tracing::warn!("OCR failed for {}: {}", stored.filename, reason);
                return Err(AppError::OcrFailed);
            }
            Err(e) => {
                tracing::error!("Unexpected OCR error for {}: {:#}", stored.filename, e);
                return Err(AppError::OcrFailed);
            }
        }

        let extractor = self.extractor.clone();
        let extract_path = output_path.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract(&extract_path))
            .await
            .map_err(|e| AppError::Server(e.to_string()))?
            .map_err(|e| {
                tracing::error!("Error extracting text: {:#}", e);
                AppError::OcrFailed
            })?;

        tracing::info!(
            "📄 Processed {} -> {} ({} chars)",
            stored.original_filename,
            output_name,
            text.len()
        );

        Ok(ProcessedFile {
            filename: output_name,
            path: output_path,
            text,
        })
    }
}

/// Maps an intake write failure. Oversized bodies surface here because the
/// body limit trips while the multipart field is being streamed to disk.
fn intake_error(e: anyhow::Error) -> AppError {
    if e.chain().any(is_body_limit_error) {
        return AppError::PayloadTooLarge(
            "Request body exceeds the maximum allowed limit".to_string(),
        );
    }
    AppError::Anyhow(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ocr::PassthroughEngine;
    use crate::services::storage::LocalStorageService;
    use anyhow::{Result, anyhow};
    use std::path::Path;

    /// Engine that always exits non-zero
    struct FailingEngine;

    #[async_trait::async_trait]
    impl OcrEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn process(&self, _input: &Path, _output: &Path) -> Result<OcrOutcome> {
            Ok(OcrOutcome::Failed {
                reason: "exit status: 2".to_string(),
            })
        }
        async fn health_check(&self) -> bool {
            false
        }
    }

    /// Engine whose executable cannot be spawned
    struct MissingEngine;

    #[async_trait::async_trait]
    impl OcrEngine for MissingEngine {
        fn name(&self) -> &'static str {
            "missing"
        }
        async fn process(&self, _input: &Path, _output: &Path) -> Result<OcrOutcome> {
            Err(anyhow!("No such file or directory (os error 2)"))
        }
        async fn health_check(&self) -> bool {
            false
        }
    }

    /// Reads the output back as UTF-8, so tests need no real PDF
    struct RawTextExtractor;

    impl TextExtractor for RawTextExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            Ok(format!("{}\n", std::fs::read_to_string(path)?))
        }
    }

    struct BrokenExtractor;

    impl TextExtractor for BrokenExtractor {
        fn extract(&self, _path: &Path) -> Result<String> {
            Err(anyhow!("invalid file header"))
        }
    }

    fn service(
        root: &Path,
        engine: Arc<dyn OcrEngine>,
        extractor: Arc<dyn TextExtractor>,
    ) -> OcrService {
        let storage = Arc::new(LocalStorageService::new(
            root.join("uploads"),
            root.join("processed"),
        ));
        OcrService::new(storage, engine, extractor)
    }

    #[tokio::test]
    async fn test_process_upload_success() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            Arc::new(PassthroughEngine),
            Arc::new(RawTextExtractor),
        );

        let processed = svc
            .process_upload("sample.pdf", "sample.pdf", Box::new(&b"hello scan"[..]))
            .await
            .unwrap();

        assert_eq!(processed.filename, "sample_ocr.pdf");
        assert_eq!(processed.download_url(), "/download/sample_ocr.pdf");
        assert_eq!(processed.text, "hello scan\n");
        assert!(tmp.path().join("uploads/sample.pdf").exists());
        assert!(tmp.path().join("processed/sample_ocr.pdf").exists());
    }

    #[tokio::test]
    async fn test_reupload_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            Arc::new(PassthroughEngine),
            Arc::new(RawTextExtractor),
        );

        let first = svc
            .process_upload("a.pdf", "a.pdf", Box::new(&b"one"[..]))
            .await
            .unwrap();
        let second = svc
            .process_upload("a.pdf", "a.pdf", Box::new(&b"two"[..]))
            .await
            .unwrap();

        assert_eq!(first.filename, second.filename);
        assert_eq!(second.text, "two\n");
        assert!(svc.locks.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_maps_to_ocr_failed() {
        let tmp = tempfile::tempdir().unwrap();
        for engine in [
            Arc::new(FailingEngine) as Arc<dyn OcrEngine>,
            Arc::new(MissingEngine) as Arc<dyn OcrEngine>,
        ] {
            let svc = service(tmp.path(), engine, Arc::new(RawTextExtractor));
            let err = svc
                .process_upload("a.pdf", "a.pdf", Box::new(&b"x"[..]))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::OcrFailed));
            // Intake file is not rolled back
            assert!(tmp.path().join("uploads/a.pdf").exists());
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_maps_to_ocr_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = service(
            tmp.path(),
            Arc::new(PassthroughEngine),
            Arc::new(BrokenExtractor),
        );
        let err = svc
            .process_upload("a.pdf", "a.pdf", Box::new(&b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OcrFailed));
    }

    #[tokio::test]
    async fn test_intake_failure_is_server_error() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the intake directory should be
        let blocker = tmp.path().join("uploads");
        std::fs::write(&blocker, b"").unwrap();

        let svc = service(
            tmp.path(),
            Arc::new(PassthroughEngine),
            Arc::new(RawTextExtractor),
        );
        let err = svc
            .process_upload("a.pdf", "a.pdf", Box::new(&b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Anyhow(_)));
        assert!(err.to_string().starts_with("Server error: "));
    }

    #[test]
    fn test_intake_error_detects_body_limit() {
        let err = anyhow::Error::new(std::io::Error::other("length limit exceeded"))
            .context("cannot write uploads/a.pdf");
        assert!(matches!(intake_error(err), AppError::PayloadTooLarge(_)));
    }
}
