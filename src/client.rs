//! HTTP client for the validation backend.
//!
//! [`ValidatorClient`] owns one `reqwest::Client` (one connection pool) and
//! the [`ClientConfig`]. It knows how to send a payload and how to classify
//! the reply; rendering is left to [`crate::endpoint`].

use crate::config::{ClientConfig, ResponseMode};
use crate::error::ValidateError;
use crate::payload::ParsedPayload;
use crate::reply::ValidationReply;
use crate::stream::{decode_body_stream, ReplyStream};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A configured client for both endpoint styles.
#[derive(Debug, Clone)]
pub struct ValidatorClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ValidatorClient {
    /// Build a client from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ValidateError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("medicheck-client/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ValidateError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST `payload` to the buffered endpoint and parse the JSON reply.
    ///
    /// The body is parsed before the status is looked at, so a non-JSON
    /// error page surfaces as [`ValidateError::InvalidResponse`] whatever
    /// its status. A failing status then becomes [`ValidateError::Server`]
    /// carrying the reply's `detail`.
    pub async fn submit_buffered(
        &self,
        payload: &ParsedPayload,
    ) -> Result<ValidationReply, ValidateError> {
        let url = self.config.endpoint_url(ResponseMode::Buffered)?;
        let response = self.post(&url, payload, "application/json").await?;
        let status = response.status();

        let body = response
            .bytes()
            .await
            .map_err(|e| self.reqwest_error(&url, e))?;
        debug!("Buffered reply: HTTP {}, {} bytes", status, body.len());

        let reply = ValidationReply::from_body(&body).inspect_err(|e| {
            warn!("Unparseable reply from {}: {:?}", url, e);
        })?;

        if !status.is_success() {
            warn!("Server rejected submission: HTTP {}", status);
            return Err(ValidateError::Server {
                status: status.as_u16(),
                detail: reply.detail.filter(|d| !d.is_empty()),
            });
        }
        Ok(reply)
    }

    /// POST `payload` to the streaming endpoint and return the decoded body.
    ///
    /// Resolves once the response headers arrive. A failing status is read
    /// in full and reported as [`ValidateError::Server`]; otherwise the
    /// returned stream yields text chunks until the server closes it.
    pub async fn submit_streaming(
        &self,
        payload: &ParsedPayload,
    ) -> Result<ReplyStream, ValidateError> {
        let url = self.config.endpoint_url(ResponseMode::Streaming)?;
        let response = self.post(&url, payload, "text/markdown, text/plain, */*").await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| self.reqwest_error(&url, e))?;
            let detail = server_detail(&body);
            warn!("Server rejected streamed submission: HTTP {}", status);
            return Err(ValidateError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(decode_body_stream(
            url.to_string(),
            Box::pin(response.bytes_stream()),
            self.config.request_timeout_secs,
        ))
    }

    async fn post(
        &self,
        url: &Url,
        payload: &ParsedPayload,
        accept: &'static str,
    ) -> Result<Response, ValidateError> {
        let body = payload.to_body()?;
        info!("POST {} ({} bytes)", url, body.len());
        self.http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .body(body)
            .send()
            .await
            .map_err(|e| self.reqwest_error(url, e))
    }

    fn reqwest_error(&self, url: &Url, err: reqwest::Error) -> ValidateError {
        ValidateError::from_reqwest(url.as_str(), err, self.config.request_timeout_secs)
    }
}

/// Error text from a failing streamed reply: JSON `detail`, else the body text.
fn server_detail(body: &[u8]) -> Option<String> {
    let parsed = serde_json::from_slice::<serde_json::Value>(body);
    if let Ok(value @ serde_json::Value::Object(_)) = parsed {
        return ValidationReply::from_value(value)
            .detail
            .filter(|d| !d.is_empty());
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}
