//! One-shot entry points: file in, rendered reply out.
//!
//! These wrap the controller flow for callers with no view of their own:
//! load the file, submit it to the endpoint selected by
//! [`ClientConfig::mode`], and return the [`SubmissionReport`]. Errors are
//! returned, not rendered. Use [`crate::ValidationController`] to drive an
//! interactive view, or [`crate::stream::validate_stream`] to consume the
//! raw streamed text.

use crate::config::ClientConfig;
use crate::endpoint::endpoint_for;
use crate::error::ValidateError;
use crate::payload::{load_payload, ParsedPayload};
use crate::reply::SubmissionReport;
use crate::view::{NoopView, ResultView};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Validate a JSON file against the configured backend.
///
/// # Errors
/// - the file is missing, unreadable or not JSON
/// - the request fails, or the server rejects the payload
/// - a buffered reply is not JSON or carries no `message`
pub async fn validate_file(
    path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<SubmissionReport, ValidateError> {
    let path = path.as_ref();
    info!("Starting validation: {} ({:?})", path.display(), config.mode);
    let payload = load_payload(path).await?;
    validate_payload(&payload, config, &mut NoopView).await
}

/// Submit an already-parsed payload, rendering into `view` as replies arrive.
pub async fn validate_payload(
    payload: &ParsedPayload,
    config: &ClientConfig,
    view: &mut dyn ResultView,
) -> Result<SubmissionReport, ValidateError> {
    let total_start = Instant::now();
    let endpoint = endpoint_for(config)?;
    view.set_loading(true);
    let result = endpoint.submit(payload, &mut *view).await;
    view.set_loading(false);
    let report = result?;
    info!(
        "Validation complete: {} chunks, {}ms total",
        report.chunks,
        total_start.elapsed().as_millis()
    );
    Ok(report)
}

/// Validate a file and write the rendered reply to `output_path`.
///
/// Atomic write: the reply goes to a temp file in the target directory,
/// which is then renamed over `output_path`.
pub async fn validate_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<SubmissionReport, ValidateError> {
    let report = validate_file(path, config).await?;
    write_atomic(output_path.as_ref(), report.rendered.as_bytes()).await?;
    Ok(report)
}

/// Synchronous wrapper around [`validate_file`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn validate_file_sync(
    path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<SubmissionReport, ValidateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ValidateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(validate_file(path, config))
}

/// Parse a file without submitting it.
///
/// Does not need a reachable backend.
pub async fn check_file(path: impl AsRef<Path>) -> Result<ParsedPayload, ValidateError> {
    load_payload(path.as_ref()).await
}

/// Write `bytes` to `path` via a temp file + rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ValidateError> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ValidateError::Internal(format!("Write task panicked: {}", e)))?
    .map_err(|source| ValidateError::OutputWriteFailed { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_file_parses_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("summary.json");
        std::fs::write(&p, r#"{"patient_demographics": {"full_name": "A"}}"#).unwrap();
        let payload = check_file(&p).await.unwrap();
        assert_eq!(payload.top_level_keys(), Some(1));
    }

    #[tokio::test]
    async fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out/result.html");
        write_atomic(&out, b"<h1>Hello</h1>\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "<h1>Hello</h1>\n");
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.md");
        std::fs::write(&out, "old").unwrap();
        write_atomic(&out, b"new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "new");
    }

    #[tokio::test]
    async fn validate_file_reports_invalid_json_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.json");
        std::fs::write(&p, "{oops").unwrap();
        // Port 9 (discard) is never contacted: parsing fails first.
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let err = validate_file(&p, &config).await.unwrap_err();
        assert!(matches!(err, ValidateError::InvalidJson { .. }));
    }
}
