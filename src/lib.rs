//! # medicheck-client
//!
//! Validate clinical-summary JSON files against a MediCheck backend and
//! render its verdict, either as one buffered reply or as Markdown streamed
//! in chunks and re-rendered as it arrives.
//!
//! ## Flow
//!
//! ```text
//! JSON file
//!  │
//!  ├─ 1. Load     read + parse locally; invalid JSON never leaves the machine
//!  ├─ 2. Submit   POST to /api/validate-summary or /api/validate-summary-stream
//!  ├─ 3. Decode   buffered: one JSON object │ streamed: UTF-8 text chunks
//!  ├─ 4. Render   HTML (pulldown-cmark), raw Markdown, or plain text
//!  └─ 5. Display  into a ResultView: content, submit toggle, spinner
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medicheck_client::{validate_file, ClientConfig, ResponseMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .mode(ResponseMode::Buffered)
//!         .build()?;
//!     let report = validate_file("summary.json", &config).await?;
//!     println!("{}", report.rendered);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a view
//!
//! [`ValidationController`] reproduces the interactive page: it enables
//! submission only while a valid file is loaded, clears stale results on
//! every new selection, shows a loading indicator during submission and
//! renders failures inline.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medicheck` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod payload;
pub mod render;
pub mod reply;
pub mod stream;
pub mod validate;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::ValidatorClient;
pub use config::{ClientConfig, ClientConfigBuilder, ResponseMode};
pub use controller::{ControllerState, SubmitOutcome, ValidationController};
pub use endpoint::{endpoint_for, BufferedEndpoint, StreamingEndpoint, ValidationEndpoint};
pub use error::{ErrorKind, ValidateError};
pub use payload::{load_payload, ParsedPayload};
pub use render::{markdown_to_html, RenderFormat, Renderer};
pub use reply::{group_missing_fields, MissingSection, SubmissionReport, ValidationReply, Verdict};
pub use stream::{validate_stream, ReplyStream, Utf8ChunkDecoder};
pub use validate::{
    check_file, validate_file, validate_file_sync, validate_payload, validate_to_file,
    write_atomic,
};
pub use view::{MemoryView, NoopView, ResultView};
