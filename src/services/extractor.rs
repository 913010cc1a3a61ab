use anyhow::{Context, Result};
use lopdf::Document;
use std::path::Path;

/// Pulls the plain-text layer out of a PDF on disk.
pub trait TextExtractor: Send + Sync {
    /// Page texts in page order, each followed by `\n`.
    ///
    /// A page whose content cannot be decoded contributes an empty string;
    /// only a file that cannot be opened or parsed at all is an error.
    fn extract(&self, path: &Path) -> Result<String>;
}

pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let doc = Document::load_from(file)
            .with_context(|| format!("cannot parse PDF {}", path.display()))?;

        let mut text = String::new();
        // get_pages is keyed by 1-based page number, so iteration is in page order
        for page_number in doc.get_pages().into_keys() {
            let page_text = doc.extract_text(&[page_number]).unwrap_or_else(|e| {
                tracing::warn!(
                    "Page {} of {} has no extractable text: {}",
                    page_number,
                    path.display(),
                    e
                );
                String::new()
            });
            text.push_str(&page_text);
            text.push('\n');
        }

        Ok(text)
    }
}
