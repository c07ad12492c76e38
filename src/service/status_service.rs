//! Status read/write operations.
//!
//! Each operation validates its input before touching the store and makes
//! at most one validated round trip per step. Writes check that the record
//! exists first and fail with `NotFound` otherwise; they never create rows.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::StatusError;
use crate::service::credential::DriverCredential;
use crate::store::{Status, StatusLabel, StatusRecord, StatusStore};

/// Body of a status read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetStatusRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of a status write. `status` stays untyped until validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetStatusRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
}

/// Stateless service over an explicitly provided store.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn StatusStore>,
    credential: Option<DriverCredential>,
}

impl StatusService {
    /// Creates a service with open writes.
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            credential: None,
        }
    }

    /// Requires `credential` on every write.
    pub fn with_credential(mut self, credential: DriverCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn requires_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Returns the current status for the requested id.
    pub fn get_status(&self, request: &GetStatusRequest) -> Result<Status, StatusError> {
        let id = require_id(request.id.as_deref())?;

        match self.store.fetch(id)? {
            Some(record) => Ok(record.status),
            None => Err(StatusError::NotFound(id.to_string())),
        }
    }

    /// Writes a new status onto an existing record.
    ///
    /// Order: input validation, token check, existence check, update.
    /// Nothing reaches the store until the first two pass.
    pub fn set_status(
        &self,
        request: &SetStatusRequest,
        token: Option<&str>,
    ) -> Result<Vec<StatusRecord>, StatusError> {
        let id = require_id(request.id.as_deref())?;
        let status = parse_status(request.status.as_ref())?;

        if !self.verify_credential(token) {
            tracing::warn!(id, "Rejected status write with bad driver token");
            return Err(StatusError::Unauthorized);
        }

        if self.store.fetch(id)?.is_none() {
            return Err(StatusError::NotFound(id.to_string()));
        }

        let updated = self.store.update(id, status)?;
        if updated.is_empty() {
            // Row vanished between the existence check and the write.
            return Err(StatusError::NotFound(id.to_string()));
        }

        tracing::info!(id, status = status.code(), label = status.label(), "Status updated");
        Ok(updated)
    }

    /// Checks a presented driver token. Always true when no token is configured.
    pub fn verify_credential(&self, token: Option<&str>) -> bool {
        match (&self.credential, token) {
            (None, _) => true,
            (Some(credential), Some(token)) => credential.verify(token),
            (Some(_), None) => false,
        }
    }

    /// The label set writes are validated against.
    pub fn labels(&self) -> Vec<StatusLabel> {
        Status::all().map(StatusLabel::from).collect()
    }
}

fn require_id(id: Option<&str>) -> Result<&str, StatusError> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(StatusError::validation("Missing id")),
    }
}

fn parse_status(value: Option<&Value>) -> Result<Status, StatusError> {
    let code = value
        .and_then(Value::as_i64)
        .ok_or_else(|| StatusError::validation("Missing or invalid status"))?;

    Status::from_code(code)
        .ok_or_else(|| StatusError::validation(format!("Unknown status code {code}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::error::StoreError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the in-memory database and counts every store call.
    struct CountingStore {
        inner: Database,
        calls: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn seeded(id: &str, code: i64) -> Arc<Self> {
            let inner = Database::open_in_memory().unwrap();
            inner.provision(id, Status::from_code(code).unwrap()).unwrap();
            Arc::new(Self {
                inner,
                calls: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            })
        }
    }

    impl StatusStore for CountingStore {
        fn fetch(&self, id: &str) -> Result<Option<StatusRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(id)
        }

        fn update(&self, id: &str, status: Status) -> Result<Vec<StatusRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(id, status)
        }

        fn provision(&self, id: &str, status: Status) -> Result<StatusRecord, StoreError> {
            self.inner.provision(id, status)
        }
    }

    struct BrokenStore;

    impl StatusStore for BrokenStore {
        fn fetch(&self, _: &str) -> Result<Option<StatusRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn update(&self, _: &str, _: Status) -> Result<Vec<StatusRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn provision(&self, _: &str, _: Status) -> Result<StatusRecord, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    fn get(id: Option<&str>) -> GetStatusRequest {
        GetStatusRequest {
            id: id.map(str::to_string),
        }
    }

    fn set(body: Value) -> SetStatusRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_get_status_returns_stored_value() {
        let store = CountingStore::seeded("abc", 1);
        let service = StatusService::new(store);

        let status = service.get_status(&get(Some("abc"))).unwrap();
        assert_eq!(status.code(), 1);
    }

    #[test]
    fn test_get_status_rejects_missing_id_before_store() {
        let store = CountingStore::seeded("abc", 0);
        let service = StatusService::new(store.clone());

        for request in [get(None), get(Some("")), get(Some("   "))] {
            assert!(matches!(
                service.get_status(&request),
                Err(StatusError::Validation(_))
            ));
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_status_unknown_id_is_not_found() {
        let service = StatusService::new(CountingStore::seeded("abc", 0));
        assert!(matches!(
            service.get_status(&get(Some("nope"))),
            Err(StatusError::NotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_store_failure_is_store_error() {
        let service = StatusService::new(Arc::new(BrokenStore));
        assert!(matches!(
            service.get_status(&get(Some("abc"))),
            Err(StatusError::Store(_))
        ));
        assert!(matches!(
            service.set_status(&set(json!({"id": "abc", "status": 1})), None),
            Err(StatusError::Store(_))
        ));
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let service = StatusService::new(CountingStore::seeded("abc", 0));

        let updated = service
            .set_status(&set(json!({"id": "abc", "status": 2})), None)
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status.code(), 2);

        let status = service.get_status(&get(Some("abc"))).unwrap();
        assert_eq!(status.code(), 2);
    }

    #[test]
    fn test_set_status_rejects_bad_shapes_without_mutation() {
        let store = CountingStore::seeded("abc", 0);
        let service = StatusService::new(store.clone());

        let bodies = [
            json!({"id": "abc", "status": "not-a-number"}),
            json!({"id": "abc"}),
            json!({"id": "abc", "status": null}),
            json!({"id": "abc", "status": 1.5}),
            json!({"id": "abc", "status": 7}),
            json!({"status": 1}),
        ];
        for body in bodies {
            assert!(matches!(
                service.set_status(&set(body), None),
                Err(StatusError::Validation(_))
            ));
        }

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.fetch("abc").unwrap().unwrap().status.code(), 0);
    }

    #[test]
    fn test_set_status_unknown_id_is_not_found() {
        let store = CountingStore::seeded("abc", 0);
        let service = StatusService::new(store.clone());

        assert!(matches!(
            service.set_status(&set(json!({"id": "ghost", "status": 2})), None),
            Err(StatusError::NotFound(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(store.inner.fetch("ghost").unwrap().is_none());
    }

    #[test]
    fn test_set_status_requires_configured_token() {
        let store = CountingStore::seeded("abc", 0);
        let service =
            StatusService::new(store.clone()).with_credential(DriverCredential::new("1234"));
        let body = json!({"id": "abc", "status": 3});

        assert!(matches!(
            service.set_status(&set(body.clone()), None),
            Err(StatusError::Unauthorized)
        ));
        assert!(matches!(
            service.set_status(&set(body.clone()), Some("4321")),
            Err(StatusError::Unauthorized)
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        let updated = service.set_status(&set(body), Some("1234")).unwrap();
        assert_eq!(updated[0].status.code(), 3);
    }

    #[test]
    fn test_verify_credential_open_when_unconfigured() {
        let service = StatusService::new(CountingStore::seeded("abc", 0));
        assert!(!service.requires_credential());
        assert!(service.verify_credential(None));
        assert!(service.verify_credential(Some("anything")));
    }

    #[test]
    fn test_labels_cover_label_set() {
        let service = StatusService::new(CountingStore::seeded("abc", 0));
        let labels = service.labels();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[2].label, "At OCM");
        assert!(!labels[2].en_route);
    }
}
