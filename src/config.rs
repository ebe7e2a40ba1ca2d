//! Configuration types for talking to a validation backend.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. One struct holds every knob so a config can be
//! cloned into each endpoint, logged, and compared between runs.

use crate::error::ValidateError;
use crate::render::RenderFormat;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path of the buffered (one JSON object) endpoint.
pub const DEFAULT_BUFFERED_PATH: &str = "/api/validate-summary";

/// Path of the streaming (chunked Markdown) endpoint.
pub const DEFAULT_STREAM_PATH: &str = "/api/validate-summary-stream";

/// Configuration for a validation client.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use medicheck_client::{ClientConfig, ResponseMode};
///
/// let config = ClientConfig::builder()
///     .base_url("http://127.0.0.1:8000")
///     .mode(ResponseMode::Buffered)
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme, host and optional path prefix of the backend. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Which endpoint style to call on submit. Default: [`ResponseMode::Streaming`].
    pub mode: ResponseMode,

    /// Path of the buffered endpoint, appended to `base_url`.
    pub buffered_path: String,

    /// Path of the streaming endpoint, appended to `base_url`.
    pub stream_path: String,

    /// How replies are rendered into the result view. Default: [`RenderFormat::Html`].
    pub format: RenderFormat,

    /// Whole-request timeout in seconds. Default: none.
    ///
    /// A streamed reply can legitimately run for minutes while the backend
    /// works through its checks, so no limit is applied unless asked for.
    pub request_timeout_secs: Option<u64>,

    /// TCP connect timeout in seconds. Default: none.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: ResponseMode::default(),
            buffered_path: DEFAULT_BUFFERED_PATH.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            format: RenderFormat::default(),
            request_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the endpoint serving `mode`.
    ///
    /// The path is appended to `base_url` verbatim, so a base with a path
    /// prefix (`https://host/medicheck`) keeps its prefix.
    pub fn endpoint_url(&self, mode: ResponseMode) -> Result<Url, ValidateError> {
        let path = match mode {
            ResponseMode::Buffered => &self.buffered_path,
            ResponseMode::Streaming => &self.stream_path,
        };
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ValidateError::InvalidConfig(format!("invalid endpoint URL '{joined}': {e}")))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn buffered_path(mut self, path: impl Into<String>) -> Self {
        self.config.buffered_path = path.into();
        self
    }

    pub fn stream_path(mut self, path: impl Into<String>) -> Self {
        self.config.stream_path = path.into();
        self
    }

    pub fn format(mut self, format: RenderFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Zero disables the timeout.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = (secs > 0).then_some(secs);
        self
    }

    /// Zero disables the timeout.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = (secs > 0).then_some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ValidateError> {
        let c = &self.config;
        let base = Url::parse(&c.base_url).map_err(|e| {
            ValidateError::InvalidConfig(format!("base URL '{}' is not a URL: {e}", c.base_url))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ValidateError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if c.buffered_path.trim().is_empty() || c.stream_path.trim().is_empty() {
            return Err(ValidateError::InvalidConfig(
                "endpoint paths must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which reply style the backend is deployed with.
///
/// The two styles are alternative deployments of the same page: a backend
/// serves one JSON object per request, or a Markdown document streamed in
/// chunks. A client talks to exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseMode {
    /// `POST /api/validate-summary`, reply `{ "message": ..., "detail": ... }`.
    Buffered,
    /// `POST /api/validate-summary-stream`, reply is chunked Markdown. (default)
    #[default]
    Streaming,
}
