//! Buffered endpoint: one JSON reply, rendered once.

use super::ValidationEndpoint;
use crate::client::ValidatorClient;
use crate::config::ResponseMode;
use crate::error::ValidateError;
use crate::payload::ParsedPayload;
use crate::render::Renderer;
use crate::reply::SubmissionReport;
use crate::view::ResultView;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

/// Submits to `POST /api/validate-summary` and renders the reply's `message`.
#[derive(Debug, Clone)]
pub struct BufferedEndpoint {
    client: ValidatorClient,
    renderer: Renderer,
}

impl BufferedEndpoint {
    pub fn new(client: ValidatorClient) -> Self {
        let renderer = Renderer::new(client.config().format);
        Self { client, renderer }
    }
}

#[async_trait]
impl ValidationEndpoint for BufferedEndpoint {
    fn mode(&self) -> ResponseMode {
        ResponseMode::Buffered
    }

    async fn submit(
        &self,
        payload: &ParsedPayload,
        view: &mut dyn ResultView,
    ) -> Result<SubmissionReport, ValidateError> {
        let start = Instant::now();
        let reply = self.client.submit_buffered(payload).await?;

        let Some(message) = reply.display_message().map(str::to_string) else {
            warn!("Reply carried no message");
            return Err(ValidateError::NoMessage);
        };

        let rendered = self.renderer.message(&message);
        view.set_content(&rendered);

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Buffered reply rendered: {} chars in {}ms",
            message.len(),
            duration_ms
        );

        Ok(SubmissionReport {
            mode: ResponseMode::Buffered,
            raw: message,
            rendered,
            reply: Some(reply),
            chunks: 1,
            duration_ms,
        })
    }
}
