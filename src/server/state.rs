//! Shared application state for the HTTP server.

use crate::service::StatusService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Status service; owns the store handle created at startup.
    pub service: StatusService,
}

impl AppState {
    /// Creates new app state around an already constructed service.
    pub fn new(service: StatusService) -> Self {
        Self { service }
    }
}
