use crate::error::Result;
use crate::link::Link;
use async_trait::async_trait;

/// Aggregate counters reported by [`LinkRepository::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of stored links, tombstoned rows included.
    pub urls: u64,
    /// Number of distinct non-empty owner ids.
    pub users: u64,
}

/// The storage contract shared by the memory, file, and database backends.
///
/// All implementations enforce strict deduplication: an insert whose
/// `original` already exists fails with [`Conflict`], and across concurrent
/// inserts of an identical `original` exactly one succeeds. Rows are never
/// removed; deletion is a monotonic tombstone.
///
/// [`Conflict`]: crate::StorageError::Conflict
#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    /// Inserts a new link.
    ///
    /// Fails with [`Conflict`] when the original is already mapped and
    /// with [`IdCollision`] when the short id is taken.
    ///
    /// [`Conflict`]: crate::StorageError::Conflict
    /// [`IdCollision`]: crate::StorageError::IdCollision
    async fn insert(&self, link: &Link) -> Result<()>;

    /// Inserts a batch of links atomically: all or none.
    async fn insert_batch(&self, links: &[Link]) -> Result<()>;

    /// Looks up a link by its short id.
    async fn get_by_short(&self, short: &str) -> Result<Link>;

    /// Looks up a link by its original URL.
    async fn get_by_original(&self, original: &str) -> Result<Link>;

    /// Returns every link owned by `user_id`. Never returns another
    /// user's links; an unknown user yields an empty list.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Link>>;

    /// Marks a link as deleted.
    ///
    /// Silently does nothing when the short does not exist or is owned
    /// by a different user. Idempotent.
    async fn mark_deleted(&self, user_id: &str, short: &str) -> Result<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Returns aggregate URL and user counts.
    async fn stats(&self) -> Result<StoreStats>;
}
