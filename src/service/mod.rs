//! Status service: validated reads and writes of the tracked record.

pub mod credential;
pub mod status_service;

pub use credential::DriverCredential;
pub use status_service::*;
