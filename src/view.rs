//! The result view: where the controller puts what the user sees.
//!
//! A [`ResultView`] stands in for the page's three controls: the submit
//! button, the result container and the loading spinner. The controller and
//! the endpoints only talk to this trait, so the same flow drives a
//! terminal, a GUI widget or an in-memory recorder.
//!
//! # Example
//!
//! ```rust
//! use medicheck_client::ResultView;
//!
//! #[derive(Default)]
//! struct StdoutView;
//!
//! impl ResultView for StdoutView {
//!     fn set_submit_enabled(&mut self, enabled: bool) {
//!         eprintln!("submit {}", if enabled { "enabled" } else { "disabled" });
//!     }
//!
//!     fn set_content(&mut self, content: &str) {
//!         println!("{content}");
//!     }
//! }
//! ```

/// Receives display updates from the controller.
///
/// Implementations must be `Send`: endpoints hold `&mut dyn ResultView`
/// across `.await` points on a multi-threaded runtime.
pub trait ResultView: Send {
    /// Enable or disable the submit control.
    fn set_submit_enabled(&mut self, enabled: bool);

    /// Replace the whole result area with `content`, already rendered.
    fn set_content(&mut self, content: &str);

    /// Empty the result area.
    fn clear(&mut self) {
        self.set_content("");
    }

    /// Show or hide the loading indicator.
    fn set_loading(&mut self, visible: bool) {
        let _ = visible;
    }
}

/// A view that discards every update.
///
/// Used by the one-shot entry points, which return the rendered result
/// instead of displaying it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopView;

impl ResultView for NoopView {
    fn set_submit_enabled(&mut self, _enabled: bool) {}

    fn set_content(&mut self, _content: &str) {}
}

/// A view that keeps its current state in memory and counts updates.
#[derive(Debug, Default, Clone)]
pub struct MemoryView {
    /// Current state of the submit control.
    pub submit_enabled: bool,
    /// Current content of the result area.
    pub content: String,
    /// Whether the loading indicator is visible.
    pub loading: bool,
    /// Every content update, in order, including clears.
    pub history: Vec<String>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty renders so far.
    pub fn render_count(&self) -> usize {
        self.history.iter().filter(|c| !c.is_empty()).count()
    }
}

impl ResultView for MemoryView {
    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.history.push(self.content.clone());
    }

    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
    }
}
