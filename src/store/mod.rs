//! Status store boundary.
//!
//! The service never talks to a concrete backend; it is handed an
//! explicitly constructed [`StatusStore`] at startup.

pub mod types;

pub use types::*;

use crate::error::StoreError;

/// Durable holder of [`StatusRecord`] rows.
///
/// Implementations must serialize concurrent writes to the same row;
/// the service performs no locking of its own.
pub trait StatusStore: Send + Sync {
    /// Fetches the record for `id`, or `None` when absent.
    fn fetch(&self, id: &str) -> Result<Option<StatusRecord>, StoreError>;

    /// Writes `status` onto the row matched by `id`.
    ///
    /// Returns the updated rows; an empty vec means no row matched.
    fn update(&self, id: &str, status: Status) -> Result<Vec<StatusRecord>, StoreError>;

    /// Creates or resets the row for `id`. Out-of-band provisioning only.
    fn provision(&self, id: &str, status: Status) -> Result<StatusRecord, StoreError>;
}
