//! Raw-text input: turns an uploaded artifact into the string the
//! classifier consumes.
//!
//! Plain text only. Document formats such as PDF need an external text
//! extractor and are rejected here.

use std::path::Path;

use tracing::debug;

use crate::error::InputError;

/// Extensions that need an external extractor.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "odt", "rtf"];

/// Decode the bytes of an uploaded file. Invalid UTF-8 is replaced, not rejected.
pub fn decode_bytes(file_name: &str, bytes: &[u8]) -> Result<String, InputError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = extension
        && DOCUMENT_EXTENSIONS.contains(&ext.as_str())
    {
        return Err(InputError::UnsupportedFormat(format!(
            "{file_name}: .{ext} files need a document text extractor"
        )));
    }

    let text = String::from_utf8_lossy(bytes).into_owned();
    require_text(text)
}

/// Read and decode a file from disk.
pub async fn read_text(path: &Path) -> Result<String, InputError> {
    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read input file");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    decode_bytes(&name, &bytes)
}

/// Reject blank input.
pub fn require_text(text: String) -> Result<String, InputError> {
    if text.trim().is_empty() {
        Err(InputError::Empty)
    } else {
        Ok(text)
    }
}
