use crate::models::{Link, NewVisit, Visit};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes).
    async fn init(&self) -> Result<()>;

    /// Create a link with a caller-provided short code.
    /// Returns `StorageError::Conflict` when the code is taken.
    async fn create_with_code(
        &self,
        short_code: &str,
        original_url: &str,
        description: Option<&str>,
    ) -> StorageResult<Link>;

    /// Look up a link by short code.
    async fn get_by_code(&self, short_code: &str) -> Result<Option<Link>>;

    /// Record one visit.
    async fn insert_visit(&self, visit: &NewVisit) -> Result<()>;

    /// Atomically increment a link's visit counter.
    async fn increment_visits(&self, link_id: i64) -> Result<()>;

    /// List links, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Link>>;

    /// List recorded visits for a link, newest first.
    async fn visits_for_link(&self, link_id: i64, limit: i64, offset: i64) -> Result<Vec<Visit>>;

    /// Delete a link and its visits. Returns false when the link was absent.
    async fn delete(&self, link_id: i64) -> Result<bool>;
}
