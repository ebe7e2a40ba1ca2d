//! Streaming endpoint: Markdown chunks, re-rendered as they arrive.

use super::ValidationEndpoint;
use crate::client::ValidatorClient;
use crate::config::ResponseMode;
use crate::error::ValidateError;
use crate::payload::ParsedPayload;
use crate::render::{MarkdownDocument, Renderer};
use crate::reply::SubmissionReport;
use crate::view::ResultView;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info};

/// Submits to `POST /api/validate-summary-stream` and renders progressively.
///
/// After every non-empty chunk the whole accumulated document is rendered
/// and pushed to the view, so the view always shows a complete rendering of
/// everything received so far.
#[derive(Debug, Clone)]
pub struct StreamingEndpoint {
    client: ValidatorClient,
    renderer: Renderer,
}

impl StreamingEndpoint {
    pub fn new(client: ValidatorClient) -> Self {
        let renderer = Renderer::new(client.config().format);
        Self { client, renderer }
    }
}

#[async_trait]
impl ValidationEndpoint for StreamingEndpoint {
    fn mode(&self) -> ResponseMode {
        ResponseMode::Streaming
    }

    async fn submit(
        &self,
        payload: &ParsedPayload,
        view: &mut dyn ResultView,
    ) -> Result<SubmissionReport, ValidateError> {
        let start = Instant::now();
        let mut stream = self.client.submit_streaming(payload).await?;

        let mut document = MarkdownDocument::new();
        let mut rendered = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            document.append(&chunk);
            rendered = document.render(&self.renderer);
            view.set_content(&rendered);
            debug!(
                "Chunk {}: document now {} chars",
                document.chunks(),
                document.text().len()
            );
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Stream complete: {} chunks, {} chars in {}ms",
            document.chunks(),
            document.text().len(),
            duration_ms
        );

        let chunks = document.chunks();
        Ok(SubmissionReport {
            mode: ResponseMode::Streaming,
            raw: document.into_text(),
            rendered,
            reply: None,
            chunks,
            duration_ms,
        })
    }
}
