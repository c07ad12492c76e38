//! What a poller shows, and where it shows it.

use crate::poller::Mode;
use crate::store::Status;

/// Snapshot of the status a client is currently displaying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Mode the poller is in.
    pub mode: Mode,

    /// Last status fetched or optimistically written.
    pub status: Option<Status>,

    /// True from mode entry until the first poll completes.
    pub loading: bool,
}

impl DisplayState {
    /// One-line text for the current state.
    pub fn headline(&self) -> String {
        if self.loading {
            return "Loading…".to_string();
        }
        match self.status {
            Some(status) => format!("Current Status: {}", status.label()),
            None => "No status".to_string(),
        }
    }
}

/// Output surface for a poller.
pub trait Renderer: Send + Sync {
    /// Called whenever the displayed state changes.
    fn render(&self, state: &DisplayState);

    /// Blocking, user-facing notice (failed write, wrong code).
    fn alert(&self, message: &str);
}

/// Renders to stdout/stderr.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&self, state: &DisplayState) {
        let icon = match state.status {
            Some(status) if status.is_en_route() => "🚌",
            Some(_) => "📍",
            None => "  ",
        };
        println!("[{}] {} {}", state.mode, icon, state.headline());
    }

    fn alert(&self, message: &str) {
        eprintln!("⚠ {message}");
    }
}
