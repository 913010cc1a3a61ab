use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Marker inserted between the stem and the extension of OCR output names
pub const OCR_SUFFIX: &str = "_ocr";

/// Result of an OCR run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// The engine exited cleanly and wrote the output file
    Completed,
    /// The engine ran but did not succeed (non-zero exit, timeout)
    Failed { reason: String },
}

/// Trait for OCR backends that turn a PDF on disk into a searchable PDF on disk
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs OCR on `input`, writing the result to `output`.
    ///
    /// `Err` means the engine could not be invoked at all.
    async fn process(&self, input: &Path, output: &Path) -> Result<OcrOutcome>;

    /// Check if the engine is available/healthy
    async fn health_check(&self) -> bool;
}

/// `{stem}_ocr{.ext}` for an intake filename
pub fn ocr_output_name(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, OCR_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OCR_SUFFIX),
    }
}

/// Tesseract language codes look like `eng`, `eng+deu` or `chi_sim`.
/// Anything else could be read by ocrmypdf as an extra flag.
pub fn validate_language(lang: &str) -> Result<()> {
    if lang.is_empty() || lang.len() > 20 {
        anyhow::bail!("invalid OCR language code length: {:?}", lang);
    }
    if let Some(c) = lang
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '+' && *c != '_')
    {
        anyhow::bail!("invalid character {:?} in OCR language code {:?}", c, lang);
    }
    Ok(())
}

/// Runs `ocrmypdf --force-ocr` as a child process.
///
/// Pages that already carry a text layer are rasterized and OCR'd again.
pub struct OcrMyPdfEngine {
    command: String,
    language: Option<String>,
    timeout: Option<Duration>,
}

impl OcrMyPdfEngine {
    pub fn new(command: String, language: Option<String>, timeout: Option<Duration>) -> Self {
        let language = language.filter(|lang| match validate_language(lang) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Ignoring OCR language: {}", e);
                false
            }
        });
        Self {
            command,
            language,
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = (config.ocr_timeout_secs > 0)
            .then(|| Duration::from_secs(config.ocr_timeout_secs));
        Self::new(
            config.ocr_command.clone(),
            config.ocr_language.clone(),
            timeout,
        )
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn build_command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--force-ocr");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }
        cmd.arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl OcrEngine for OcrMyPdfEngine {
    fn name(&self) -> &'static str {
        "ocrmypdf"
    }

    async fn process(&self, input: &Path, output: &Path) -> Result<OcrOutcome> {
        let started = std::time::Instant::now();
        let mut cmd = self.build_command(input, output);

        tracing::info!(
            "🔍 Running {} on {} -> {}",
            self.command,
            input.display(),
            output.display()
        );

        // Dropping the future on timeout kills the child (kill_on_drop)
        let run = cmd.output();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!("OCR timed out after {:?} on {}", limit, input.display());
                    return Ok(OcrOutcome::Failed {
                        reason: format!("timed out after {}s", limit.as_secs()),
                    });
                }
            },
            None => run.await,
        };
        let result = result.with_context(|| format!("failed to run {}", self.command))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::error!("OCR Error ({}): {}", result.status, stderr.trim());
            return Ok(OcrOutcome::Failed {
                reason: format!("{} exited with {}", self.command, result.status),
            });
        }

        tracing::info!(
            "✅ OCR finished for {} in {:?}",
            input.display(),
            started.elapsed()
        );
        Ok(OcrOutcome::Completed)
    }

    async fn health_check(&self) -> bool {
        let status = Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        matches!(status, Ok(status) if status.success())
    }
}

/// Copies the input through unchanged, for development without ocrmypdf installed
pub struct PassthroughEngine;

#[async_trait::async_trait]
impl OcrEngine for PassthroughEngine {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn process(&self, input: &Path, output: &Path) -> Result<OcrOutcome> {
        tracing::warn!("PassthroughEngine: Skipping OCR (development mode)");
        tokio::fs::copy(input, output)
            .await
            .with_context(|| format!("cannot copy {} to {}", input.display(), output.display()))?;
        Ok(OcrOutcome::Completed)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create the OCR engine named in the config
pub fn create_engine(config: &AppConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_engine.to_lowercase().as_str() {
        "ocrmypdf" => Arc::new(OcrMyPdfEngine::from_config(config)),
        "passthrough" | "noop" | "none" => Arc::new(PassthroughEngine),
        other => {
            tracing::warn!("Unknown OCR engine '{}', using ocrmypdf", other);
            Arc::new(OcrMyPdfEngine::from_config(config))
        }
    }
}
