//! Endpoint styles: how a submission is sent and rendered.
//!
//! The controller does not care whether the backend answers with one JSON
//! object or a stream of Markdown; it holds an
//! `Arc<dyn ValidationEndpoint>` and calls [`ValidationEndpoint::submit`].
//!
//! ```text
//! payload ──▶ client (POST) ──▶ reply ──▶ renderer ──▶ view
//!                               │
//!                               ├─ buffered:  one JSON object, render `message`
//!                               └─ streaming: text chunks, re-render after each
//! ```
//!
//! 1. [`buffered`]: `POST /api/validate-summary`, a single reply
//! 2. [`streaming`]: `POST /api/validate-summary-stream`, progressive Markdown

pub mod buffered;
pub mod streaming;

pub use buffered::BufferedEndpoint;
pub use streaming::StreamingEndpoint;

use crate::client::ValidatorClient;
use crate::config::{ClientConfig, ResponseMode};
use crate::error::ValidateError;
use crate::payload::ParsedPayload;
use crate::reply::SubmissionReport;
use crate::view::ResultView;
use async_trait::async_trait;
use std::sync::Arc;

/// One way of submitting a payload and rendering the reply.
#[async_trait]
pub trait ValidationEndpoint: Send + Sync {
    /// Which reply style this endpoint consumes.
    fn mode(&self) -> ResponseMode;

    /// Send `payload` and render the reply into `view`.
    ///
    /// Writes only the result area; the controller owns the submit control
    /// and the loading indicator. On error nothing is rendered for the
    /// failure itself: the caller decides how to show it.
    async fn submit(
        &self,
        payload: &ParsedPayload,
        view: &mut dyn ResultView,
    ) -> Result<SubmissionReport, ValidateError>;
}

/// Build the endpoint selected by `config.mode`.
pub fn endpoint_for(config: &ClientConfig) -> Result<Arc<dyn ValidationEndpoint>, ValidateError> {
    let client = ValidatorClient::new(config.clone())?;
    Ok(match config.mode {
        ResponseMode::Buffered => Arc::new(BufferedEndpoint::new(client)),
        ResponseMode::Streaming => Arc::new(StreamingEndpoint::new(client)),
    })
}
