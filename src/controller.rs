//! The validation controller: file selection → submission → rendered result.
//!
//! ## States
//!
//! ```text
//! Idle ──file ok──▶ FileLoaded ──submit──▶ Submitting ──▶ Done
//!   ▲                  ▲   │                          └──▶ Failed
//!   └──no file─────────┘   └──parse error──▶ Invalid
//! ```
//!
//! Submission is only possible from a state that holds a payload
//! (`FileLoaded`, `Done`, `Failed`); the submit control in the view is
//! enabled exactly when that is the case.
//!
//! Every operation takes `&mut self`, so one controller never has two file
//! reads or two submissions in flight. Dropping a pending submission hides
//! the loading indicator and returns to `FileLoaded` with the same payload.

use crate::endpoint::{endpoint_for, ValidationEndpoint};
use crate::config::ClientConfig;
use crate::error::{ValidateError, INVALID_JSON_MESSAGE};
use crate::payload::{load_payload, ParsedPayload};
use crate::render::Renderer;
use crate::reply::SubmissionReport;
use crate::view::ResultView;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the controller is in its workflow.
#[derive(Debug, Default)]
pub enum ControllerState {
    /// Nothing selected.
    #[default]
    Idle,
    /// A valid payload is loaded and can be submitted.
    FileLoaded(ParsedPayload),
    /// The last selection could not be read or parsed.
    Invalid { message: String },
    /// A submission is in flight.
    Submitting(ParsedPayload),
    /// The last submission rendered successfully.
    Done {
        payload: ParsedPayload,
        report: SubmissionReport,
    },
    /// The last submission failed; the payload can be submitted again.
    Failed {
        payload: ParsedPayload,
        message: String,
    },
}

impl ControllerState {
    /// The payload a submission would send, if any.
    pub fn payload(&self) -> Option<&ParsedPayload> {
        match self {
            ControllerState::FileLoaded(p)
            | ControllerState::Submitting(p)
            | ControllerState::Done { payload: p, .. }
            | ControllerState::Failed { payload: p, .. } => Some(p),
            ControllerState::Idle | ControllerState::Invalid { .. } => None,
        }
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        matches!(
            self,
            ControllerState::FileLoaded(_)
                | ControllerState::Done { .. }
                | ControllerState::Failed { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            ControllerState::Idle => "Idle",
            ControllerState::FileLoaded(_) => "FileLoaded",
            ControllerState::Invalid { .. } => "Invalid",
            ControllerState::Submitting(_) => "Submitting",
            ControllerState::Done { .. } => "Done",
            ControllerState::Failed { .. } => "Failed",
        }
    }
}

/// Result of [`ValidationController::handle_submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// No payload was loaded; nothing happened.
    Skipped,
    /// The reply was rendered.
    Done(SubmissionReport),
    /// The submission failed; the error is already shown in the view.
    Failed(ValidateError),
}

/// Drives one [`ResultView`] through file selection and submission.
pub struct ValidationController<V: ResultView> {
    view: V,
    endpoint: Arc<dyn ValidationEndpoint>,
    renderer: Renderer,
    state: ControllerState,
}

impl<V: ResultView> ValidationController<V> {
    /// Bind `view` to the endpoint selected by `config.mode`.
    pub fn new(config: &ClientConfig, view: V) -> Result<Self, ValidateError> {
        let endpoint = endpoint_for(config)?;
        Ok(Self::with_endpoint(endpoint, Renderer::new(config.format), view))
    }

    /// Bind `view` to a specific endpoint. Submission starts disabled.
    pub fn with_endpoint(
        endpoint: Arc<dyn ValidationEndpoint>,
        renderer: Renderer,
        mut view: V,
    ) -> Self {
        view.set_submit_enabled(false);
        view.set_loading(false);
        Self {
            view,
            endpoint,
            renderer,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// React to the user picking a file, or cancelling the picker (`None`).
    pub async fn handle_file_selected(&mut self, file: Option<&Path>) -> &ControllerState {
        let Some(path) = file else {
            self.view.set_loading(false);
            self.view.set_submit_enabled(false);
            self.view.clear();
            self.transition(ControllerState::Idle);
            return &self.state;
        };

        // Any earlier result or error belongs to the previous file.
        self.view.set_loading(false);
        self.view.clear();

        match load_payload(path).await {
            Ok(payload) => {
                info!("Loaded {}", path.display());
                self.view.set_submit_enabled(true);
                self.view.clear();
                self.transition(ControllerState::FileLoaded(payload));
            }
            Err(e) => {
                let message = match &e {
                    ValidateError::InvalidJson { detail, .. } => {
                        warn!("Invalid JSON in {}: {}", path.display(), detail);
                        INVALID_JSON_MESSAGE.to_string()
                    }
                    other => {
                        warn!("Could not read {}: {}", path.display(), other);
                        other.to_string()
                    }
                };
                self.view.set_content(&self.renderer.error(&message));
                self.view.set_submit_enabled(false);
                self.transition(ControllerState::Invalid { message });
            }
        }
        &self.state
    }

    /// Submit the loaded payload and render the reply.
    ///
    /// A no-op returning [`SubmitOutcome::Skipped`] when nothing is loaded.
    /// Failures are shown inline as `Error: <message>` and also returned.
    pub async fn handle_submit(&mut self) -> SubmitOutcome {
        let Some(payload) = self.take_payload() else {
            debug!("Submit ignored in state {}", self.state.name());
            return SubmitOutcome::Skipped;
        };

        self.transition(ControllerState::Submitting(payload.clone()));
        self.view.clear();
        self.view.set_loading(true);

        let result = {
            let mut guard = SubmitGuard {
                view: &mut self.view,
                state: &mut self.state,
                finished: false,
            };
            let result = self.endpoint.submit(&payload, &mut *guard.view).await;
            guard.finished = true;
            result
        };

        match result {
            Ok(report) => {
                self.transition(ControllerState::Done {
                    payload,
                    report: report.clone(),
                });
                SubmitOutcome::Done(report)
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                let message = format!("Error: {e}");
                self.view.set_content(&self.renderer.error(&message));
                self.transition(ControllerState::Failed { payload, message });
                SubmitOutcome::Failed(e)
            }
        }
    }

    fn take_payload(&mut self) -> Option<ParsedPayload> {
        if !self.state.can_submit() {
            return None;
        }
        self.state.payload().cloned()
    }

    fn transition(&mut self, next: ControllerState) {
        debug!("State {} → {}", self.state.name(), next.name());
        self.state = next;
    }
}

/// Hides the loading indicator when a submission ends, however it ends.
///
/// If the submit future is dropped before the endpoint resolves, the state
/// goes back from `Submitting` to `FileLoaded` so the payload can be sent
/// again.
struct SubmitGuard<'a, V: ResultView> {
    view: &'a mut V,
    state: &'a mut ControllerState,
    finished: bool,
}

impl<V: ResultView> Drop for SubmitGuard<'_, V> {
    fn drop(&mut self) {
        self.view.set_loading(false);
        if self.finished || !matches!(self.state, ControllerState::Submitting(_)) {
            return;
        }
        if let ControllerState::Submitting(payload) = std::mem::take(self.state) {
            warn!("Submission abandoned before the reply finished");
            *self.state = ControllerState::FileLoaded(payload);
        }
    }
}
