//! Client side of the status API.
//!
//! [`StatusSource`] is what the poller talks to. The HTTP implementation
//! reaches a remote server; the service itself also implements it so a
//! poller can run in-process.

pub mod http;

pub use http::HttpStatusClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::StatusError;
use crate::service::{GetStatusRequest, SetStatusRequest, StatusService};
use crate::store::{Status, StatusRecord};

/// Failures seen by a status client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Service(#[from] StatusError),
}

/// Read/write access to the tracked status, as seen by a client.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches the current status of `id`.
    async fn fetch_status(&self, id: &str) -> Result<Status, ClientError>;

    /// Writes `status` onto `id`, presenting `token` when given.
    async fn publish_status(
        &self,
        id: &str,
        status: Status,
        token: Option<&str>,
    ) -> Result<Vec<StatusRecord>, ClientError>;

    /// Asks the service whether `token` unlocks the driver panel.
    async fn verify_token(&self, token: &str) -> Result<bool, ClientError>;
}

#[async_trait]
impl StatusSource for StatusService {
    async fn fetch_status(&self, id: &str) -> Result<Status, ClientError> {
        let request = GetStatusRequest {
            id: Some(id.to_string()),
        };
        Ok(self.get_status(&request)?)
    }

    async fn publish_status(
        &self,
        id: &str,
        status: Status,
        token: Option<&str>,
    ) -> Result<Vec<StatusRecord>, ClientError> {
        let request = SetStatusRequest {
            id: Some(id.to_string()),
            status: Some(status.code().into()),
        };
        Ok(self.set_status(&request, token)?)
    }

    async fn verify_token(&self, token: &str) -> Result<bool, ClientError> {
        Ok(self.verify_credential(Some(token)))
    }
}
