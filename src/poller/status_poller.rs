//! Mode state machine and the fixed-interval polling task.
//!
//! At most one polling task runs per [`Poller`]. Every mode change stops
//! the current task before starting the next one.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::{ClientError, StatusSource};
use crate::config::DEFAULT_RECORD_ID;
use crate::poller::display::{DisplayState, Renderer};
use crate::store::Status;

/// Client mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Unset,
    Driver { unlocked: bool },
    Viewer,
}

impl Mode {
    /// Whether this mode runs the polling task.
    pub fn polls(self) -> bool {
        !matches!(self, Mode::Unset)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Unset => f.write_str("unset"),
            Mode::Driver { unlocked: false } => f.write_str("driver, locked"),
            Mode::Driver { unlocked: true } => f.write_str("driver"),
            Mode::Viewer => f.write_str("viewer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("not in driver mode")]
    NotDriver,

    #[error("driver panel is locked")]
    Locked,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Configuration for the status poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// How often to fetch the status (default: 1s).
    pub poll_interval: Duration,

    /// Id of the tracked record.
    pub record_id: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            record_id: DEFAULT_RECORD_ID.to_string(),
        }
    }
}

/// Handle to a running polling task.
struct PollTask {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PollTask {
    fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

/// Driver/viewer client.
///
/// Mode changes spawn onto the current tokio runtime and must be made
/// from within one.
pub struct Poller<S: StatusSource + 'static> {
    source: Arc<S>,
    config: PollerConfig,
    token: Option<String>,
    display: Arc<RwLock<DisplayState>>,
    renderer: Arc<dyn Renderer>,
    task: Option<PollTask>,
}

impl<S: StatusSource + 'static> Poller<S> {
    pub fn new(source: Arc<S>, config: PollerConfig, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            source,
            config,
            token: None,
            display: Arc::new(RwLock::new(DisplayState::default())),
            renderer,
            task: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.display().mode
    }

    /// Current display snapshot.
    pub fn display(&self) -> DisplayState {
        read_display(&self.display).clone()
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }

    pub fn enter_viewer(&mut self) {
        self.set_mode(Mode::Viewer);
    }

    /// Enters driver mode with the panel locked.
    pub fn enter_driver(&mut self) {
        self.set_mode(Mode::Driver { unlocked: false });
    }

    /// Back navigation: driver returns to viewer, viewer returns to unset.
    pub fn back(&mut self) {
        let next = match self.mode() {
            Mode::Driver { .. } => Mode::Viewer,
            Mode::Viewer | Mode::Unset => Mode::Unset,
        };
        self.set_mode(next);
    }

    /// Stops polling and returns to `Unset`.
    pub fn stop(&mut self) {
        self.set_mode(Mode::Unset);
    }

    /// Unlocks the driver panel if the service accepts `token`.
    ///
    /// A rejected token raises an alert and leaves the panel locked.
    pub async fn unlock(&mut self, token: &str) -> Result<bool, PollerError> {
        match self.mode() {
            Mode::Driver { unlocked: true } => return Ok(true),
            Mode::Driver { unlocked: false } => {}
            _ => return Err(PollerError::NotDriver),
        }

        match self.source.verify_token(token).await {
            Ok(true) => {
                self.token = Some(token.to_string());
                write_display(&self.display).mode = Mode::Driver { unlocked: true };
                tracing::info!("Driver panel unlocked");
                self.render();
                Ok(true)
            }
            Ok(false) => {
                self.renderer.alert("Wrong access code!");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not verify access code");
                self.renderer.alert("Could not verify access code");
                Err(e.into())
            }
        }
    }

    /// Publishes a new status from an unlocked driver panel.
    ///
    /// The display is updated before the write completes; a failed write
    /// raises an alert.
    pub async fn select_status(&mut self, status: Status) -> Result<(), PollerError> {
        match self.mode() {
            Mode::Driver { unlocked: true } => {}
            Mode::Driver { unlocked: false } => return Err(PollerError::Locked),
            _ => return Err(PollerError::NotDriver),
        }

        write_display(&self.display).status = Some(status);
        self.render();

        let result = self
            .source
            .publish_status(&self.config.record_id, status, self.token.as_deref())
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(status = status.code(), "Status published");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, status = status.code(), "Failed to update status");
                self.renderer.alert("Failed to update status");
                Err(e.into())
            }
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if let Some(task) = self.task.take() {
            task.stop();
        }

        // Driver state never survives a mode change. A status shown by the
        // driver may be an unconfirmed optimistic write, so it goes too.
        self.token = None;
        {
            let mut state = write_display(&self.display);
            if matches!(state.mode, Mode::Driver { .. }) {
                state.status = None;
            }
            state.mode = mode;
            state.loading = mode.polls();
        }
        tracing::debug!(mode = %mode, "Poller mode changed");

        if mode.polls() {
            let shutdown = Arc::new(AtomicBool::new(false));
            let handle = spawn_polling_task(
                Arc::clone(&self.source),
                self.config.clone(),
                Arc::clone(&self.display),
                Arc::clone(&self.renderer),
                Arc::clone(&shutdown),
            );
            self.task = Some(PollTask { shutdown, handle });
        }

        self.render();
    }

    fn render(&self) {
        self.renderer.render(&self.display());
    }
}

impl<S: StatusSource + 'static> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop();
        }
    }
}

fn read_display(display: &RwLock<DisplayState>) -> RwLockReadGuard<'_, DisplayState> {
    display.read().unwrap_or_else(|poisoned| {
        tracing::error!("Display state lock poisoned, recovering");
        display.clear_poison();
        poisoned.into_inner()
    })
}

fn write_display(display: &RwLock<DisplayState>) -> RwLockWriteGuard<'_, DisplayState> {
    display.write().unwrap_or_else(|poisoned| {
        tracing::error!("Display state lock poisoned, recovering");
        display.clear_poison();
        poisoned.into_inner()
    })
}

/// Spawns the status polling task.
///
/// The first fetch happens immediately. Each tick awaits its request
/// before the next tick is scheduled, so at most one request is in flight.
pub fn spawn_polling_task<S: StatusSource + ?Sized + 'static>(
    source: Arc<S>,
    config: PollerConfig,
    display: Arc<RwLock<DisplayState>>,
    renderer: Arc<dyn Renderer>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            interval_ms = config.poll_interval.as_millis() as u64,
            id = %config.record_id,
            "Status polling started"
        );

        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            poll_once(&*source, &config.record_id, &display, &*renderer, &shutdown).await;
        }

        tracing::info!("Status polling stopped");
    })
}

/// Performs a single poll cycle.
///
/// On failure the previously displayed status is kept.
async fn poll_once<S: StatusSource + ?Sized>(
    source: &S,
    id: &str,
    display: &RwLock<DisplayState>,
    renderer: &dyn Renderer,
    shutdown: &AtomicBool,
) {
    let fetched = source.fetch_status(id).await;

    // A mode change may have landed while the request was in flight.
    if shutdown.load(Ordering::SeqCst) {
        return;
    }

    let changed = {
        let mut state = write_display(display);
        let before = state.clone();

        match fetched {
            Ok(status) => state.status = Some(status),
            Err(e) => {
                tracing::warn!(error = %e, id, "Status poll failed, keeping last value");
            }
        }
        state.loading = false;

        (*state != before).then(|| state.clone())
    };

    if let Some(state) = changed {
        renderer.render(&state);
    }
}
