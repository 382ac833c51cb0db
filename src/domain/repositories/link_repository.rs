//! Repository trait for short link records.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Result of an insert against the unique code namespace.
///
/// A lost race on the code (another writer inserted it between the
/// existence check and the insert) is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Link),
    CodeTaken,
}

/// Durable CRUD over short link records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL
/// - [`crate::infrastructure::persistence::InMemoryLinkRepository`] - process-local map
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new record.
    ///
    /// Returns [`InsertOutcome::CodeTaken`] when `new_link.code` already
    /// exists; the store enforces this atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn insert(&self, new_link: NewLink) -> Result<InsertOutcome, AppError>;

    /// Finds a record by its short code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Finds a record by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Returns true if `code` is used by any record, as a generated code or
    /// as a custom slug.
    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError>;

    /// Atomically adds one to the record's click counter.
    ///
    /// Incrementing a record that no longer exists is not an error.
    async fn increment_clicks(&self, id: i64) -> Result<(), AppError>;

    /// Deletes a record. Returns `Ok(false)` if no record had this id.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}
