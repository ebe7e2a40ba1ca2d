//! Error types for the medicheck-client library.
//!
//! Every failure is terminal for the attempt that produced it: nothing is
//! retried and nothing is partially applied. [`ValidateError`] carries enough
//! context to be shown to a user verbatim, and [`ValidateError::kind`] folds
//! the variants into the four broad failure classes a front end cares about
//! (bad local file, transport, malformed reply, server-reported error).

use std::path::PathBuf;
use thiserror::Error;

/// Inline text shown when the selected file is not valid JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON file.";

/// Inline text shown when a buffered reply body is not JSON.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server.";

/// Inline text shown when a failing reply carries no `detail`.
pub const SERVER_ERROR_MESSAGE: &str = "Server error.";

/// Inline text shown when a successful buffered reply has no `message`.
pub const NO_MESSAGE_MESSAGE: &str = "No message found in server reply.";

/// All fatal errors returned by the medicheck-client library.
#[derive(Debug, Error)]
pub enum ValidateError {
    // ── Local file errors ─────────────────────────────────────────────────
    /// Selected file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the selected file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents are not JSON.
    #[error("Invalid JSON file.")]
    InvalidJson { path: PathBuf, detail: String },

    /// Submit was requested with no parsed payload.
    #[error("No JSON file loaded; select a valid file first")]
    NoPayload,

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or the connection broke before a reply.
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// A configured request timeout elapsed.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The streamed reply broke off mid-way.
    #[error("Stream from '{url}' interrupted: {reason}")]
    Stream { url: String, reason: String },

    // ── Reply errors ──────────────────────────────────────────────────────
    /// A buffered reply body could not be parsed as JSON.
    #[error("Invalid response from server.")]
    InvalidResponse { detail: String },

    /// The server answered with a non-2xx status.
    ///
    /// Displays the server-provided `detail` verbatim when there is one.
    #[error("{}", .detail.as_deref().unwrap_or(SERVER_ERROR_MESSAGE))]
    Server { status: u16, detail: Option<String> },

    /// A successful buffered reply carried no `message` to render.
    #[error("No message found in server reply.")]
    NoMessage,

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the rendered output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad failure class of a [`ValidateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The local file is missing, unreadable or not JSON.
    InvalidFile,
    /// Network failure, timeout or broken stream.
    Transport,
    /// The server replied with something the client cannot use.
    MalformedResponse,
    /// The server reported an application error.
    Server,
    /// Configuration, output or internal failure on the client side.
    Client,
}

impl ValidateError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidateError::FileNotFound { .. }
            | ValidateError::PermissionDenied { .. }
            | ValidateError::ReadFailed { .. }
            | ValidateError::InvalidJson { .. } => ErrorKind::InvalidFile,
            ValidateError::Transport { .. }
            | ValidateError::Timeout { .. }
            | ValidateError::Stream { .. } => ErrorKind::Transport,
            ValidateError::InvalidResponse { .. } | ValidateError::NoMessage => {
                ErrorKind::MalformedResponse
            }
            ValidateError::Server { .. } => ErrorKind::Server,
            ValidateError::NoPayload
            | ValidateError::OutputWriteFailed { .. }
            | ValidateError::InvalidConfig(_)
            | ValidateError::Internal(_) => ErrorKind::Client,
        }
    }

    /// Map a `reqwest` failure against `url` to the matching variant.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: Option<u64>) -> Self {
        match timeout_secs {
            Some(secs) if err.is_timeout() => ValidateError::Timeout {
                url: url.to_string(),
                secs,
            },
            _ => ValidateError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            },
        }
    }
}
