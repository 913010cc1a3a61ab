use unicode_normalization::UnicodeNormalization;

/// Extensions accepted by the upload endpoint (compared lowercased)
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

pub const NO_SELECTED_FILE: &str = "No selected file";
pub const INVALID_FILE_TYPE: &str = "Invalid file type. Only PDF files are allowed";
pub const INVALID_FILENAME: &str = "Invalid filename";

/// Device names Windows refuses to create as regular files
const WINDOWS_DEVICE_FILES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// True when the name has a dot and its last extension is on the allowlist
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Checks the client-supplied filename of the `file` part. Pure, touches nothing on disk.
pub fn validate_upload_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError {
            code: "NO_SELECTED_FILE",
            message: NO_SELECTED_FILE.to_string(),
        });
    }

    if !allowed_file(filename) {
        return Err(ValidationError {
            code: "INVALID_FILE_TYPE",
            message: INVALID_FILE_TYPE.to_string(),
        });
    }

    Ok(())
}

/// Reduces a client filename to a flat ASCII name that is safe to join onto a
/// storage directory. Path components are folded into the name rather than
/// followed, so `../../etc/passwd` becomes `etc_passwd`.
///
/// The result may be empty (e.g. `"../"`); callers must reject that.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(|c| c.is_ascii()).collect();

    if ascii.contains("..") || ascii.contains('/') || ascii.contains('\\') {
        tracing::warn!("Path components in upload filename: {:?}", filename);
    }

    let joined = ascii
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    let device = trimmed.split('.').next().unwrap_or_default().to_uppercase();
    if cfg!(windows) && !trimmed.is_empty() && WINDOWS_DEVICE_FILES.contains(&device.as_str()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Sanitizes an accepted upload name, rejecting names that sanitize to nothing
pub fn sanitize_upload_filename(filename: &str) -> Result<String, ValidationError> {
    let sanitized = secure_filename(filename);
    if sanitized.is_empty() {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: INVALID_FILENAME.to_string(),
        });
    }
    Ok(sanitized)
}
