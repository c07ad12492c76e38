//! HTTP status client built on `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{ClientError, StatusSource};
use crate::server::routes::status::{GetStatusResponse, SetStatusResponse, VerifyTokenResponse};
use crate::store::{Status, StatusRecord};

/// Per-request timeout; a poll tick never waits longer than this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to a remote status server.
#[derive(Debug, Clone)]
pub struct HttpStatusClient {
    http: Client,
    base_url: String,
}

impl HttpStatusClient {
    /// Creates a client for the server at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decodes a success body, or turns an error body into `Rejected`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl StatusSource for HttpStatusClient {
    async fn fetch_status(&self, id: &str) -> Result<Status, ClientError> {
        let response = self
            .http
            .post(self.url("/api/get-status"))
            .json(&json!({ "id": id }))
            .send()
            .await?;

        let body: GetStatusResponse = decode(response).await?;
        Status::from_code(body.status).ok_or_else(|| {
            ClientError::InvalidResponse(format!("unknown status code {}", body.status))
        })
    }

    async fn publish_status(
        &self,
        id: &str,
        status: Status,
        token: Option<&str>,
    ) -> Result<Vec<StatusRecord>, ClientError> {
        let mut request = self
            .http
            .post(self.url("/api/update-status"))
            .json(&json!({ "id": id, "status": status.code() }));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let body: SetStatusResponse = decode(request.send().await?).await?;
        Ok(body.data)
    }

    async fn verify_token(&self, token: &str) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.url("/api/verify-token"))
            .bearer_auth(token)
            .send()
            .await?;

        let body: VerifyTokenResponse = decode(response).await?;
        Ok(body.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::service::{DriverCredential, StatusService};
    use crate::store::StatusStore;
    use std::sync::Arc;

    /// Serves the router on an ephemeral port and returns its base URL.
    async fn spawn_server(token: Option<&str>) -> String {
        let db = Database::open_in_memory().unwrap();
        db.provision("abc", Status::from_code(0).unwrap()).unwrap();
        let mut service = StatusService::new(Arc::new(db));
        if let Some(token) = token {
            service = service.with_credential(DriverCredential::new(token));
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, crate::server::router(service))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpStatusClient::new("http://localhost:1/").unwrap();
        assert_eq!(client.url("/api/labels"), "http://localhost:1/api/labels");
    }

    #[tokio::test]
    async fn test_fetch_and_publish_over_http() {
        let client = HttpStatusClient::new(spawn_server(Some("1234")).await).unwrap();

        assert_eq!(client.fetch_status("abc").await.unwrap().code(), 0);

        let two = Status::from_code(2).unwrap();
        let rows = client.publish_status("abc", two, Some("1234")).await.unwrap();
        assert_eq!(rows[0].status, two);
        assert_eq!(client.fetch_status("abc").await.unwrap(), two);
    }

    #[tokio::test]
    async fn test_error_bodies_become_rejections() {
        let client = HttpStatusClient::new(spawn_server(Some("1234")).await).unwrap();

        match client.fetch_status("ghost").await {
            Err(ClientError::Rejected { status, message }) => {
                assert_eq!(status, 404);
                assert!(message.contains("ghost"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let one = Status::from_code(1).unwrap();
        assert!(matches!(
            client.publish_status("abc", one, Some("bad")).await,
            Err(ClientError::Rejected { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_token_over_http() {
        let client = HttpStatusClient::new(spawn_server(Some("1234")).await).unwrap();
        assert!(client.verify_token("1234").await.unwrap());
        assert!(!client.verify_token("0000").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = HttpStatusClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            client.fetch_status("abc").await,
            Err(ClientError::Http(_))
        ));
    }
}
