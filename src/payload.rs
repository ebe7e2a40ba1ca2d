//! Input resolution: read a user-selected file and parse it as JSON.
//!
//! The backend defines the schema, so the client only checks that the file
//! is syntactically valid JSON. Any JSON value is accepted, including
//! scalars and `null`.

use crate::error::ValidateError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A successfully parsed JSON document, ready to be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPayload {
    value: Value,
    source: Option<PathBuf>,
    byte_len: usize,
}

impl ParsedPayload {
    /// Parse JSON text that did not come from a file.
    pub fn parse(text: &str) -> Result<Self, ValidateError> {
        parse_text(text, None)
    }

    /// Wrap an already-built JSON value.
    pub fn from_value(value: Value) -> Self {
        Self {
            value,
            source: None,
            byte_len: 0,
        }
    }

    /// The parsed document.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Path the payload was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Size of the original file text in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Serialise the payload as a request body.
    pub fn to_body(&self) -> Result<Vec<u8>, ValidateError> {
        serde_json::to_vec(&self.value)
            .map_err(|e| ValidateError::Internal(format!("failed to serialise payload: {e}")))
    }

    /// Number of top-level keys, or `None` when the document is not an object.
    pub fn top_level_keys(&self) -> Option<usize> {
        self.value.as_object().map(|o| o.len())
    }
}

/// Read the selected file as UTF-8 text.
pub async fn read_selected_file(path: &Path) -> Result<String, ValidateError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8(bytes).map_err(|e| ValidateError::InvalidJson {
            path: path.to_path_buf(),
            detail: format!("file is not UTF-8: {e}"),
        }),
        Err(e) => Err(match e.kind() {
            std::io::ErrorKind::NotFound => ValidateError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ValidateError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ValidateError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        }),
    }
}

/// Read `path` and parse its contents as JSON.
pub async fn load_payload(path: &Path) -> Result<ParsedPayload, ValidateError> {
    let text = read_selected_file(path).await?;
    let payload = parse_text(&text, Some(path))?;
    debug!(
        "Loaded payload from {} ({} bytes)",
        path.display(),
        payload.byte_len
    );
    Ok(payload)
}

fn parse_text(text: &str, source: Option<&Path>) -> Result<ParsedPayload, ValidateError> {
    // A UTF-8 BOM is common in files saved by Windows editors.
    let trimmed = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(ParsedPayload {
            value,
            source: source.map(Path::to_path_buf),
            byte_len: text.len(),
        }),
        Err(e) => Err(ValidateError::InvalidJson {
            path: source.map(Path::to_path_buf).unwrap_or_default(),
            detail: e.to_string(),
        }),
    }
}
