use std::sync::Arc;

use portkey_core::{Generator, Link, LinkRepository, Result, StorageError};
use tracing::debug;

/// How many fresh ids to try when an insert collides at the short level.
const MAX_ID_RETRIES: usize = 3;

/// Outcome of a create: either a fresh link or the pre-existing mapping
/// for an already-shortened original.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Link),
    Existing(Link),
}

impl CreateOutcome {
    pub fn link(&self) -> &Link {
        match self {
            CreateOutcome::Created(link) | CreateOutcome::Existing(link) => link,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, CreateOutcome::Existing(_))
    }
}

/// The single insert path shared by the HTTP and RPC front-ends.
///
/// Pairs id generation with the store's uniqueness constraints: a
/// short-level collision retries with a fresh id a bounded number of
/// times, a duplicate original resolves to the existing mapping.
#[derive(Clone)]
pub struct ShortenService {
    repo: Arc<dyn LinkRepository>,
    generator: Arc<dyn Generator>,
}

impl ShortenService {
    pub fn new(repo: Arc<dyn LinkRepository>, generator: Arc<dyn Generator>) -> Self {
        Self { repo, generator }
    }

    /// Creates a link for `original` owned by `user_id`.
    pub async fn create(&self, original: &str, user_id: &str) -> Result<CreateOutcome> {
        let mut attempts = 0;
        loop {
            let link = Link::new(self.generator.generate(), original, user_id);
            match self.repo.insert(&link).await {
                Ok(()) => return Ok(CreateOutcome::Created(link)),
                Err(StorageError::Conflict(_)) => {
                    let existing = self.repo.get_by_original(original).await?;
                    return Ok(CreateOutcome::Existing(existing));
                }
                Err(StorageError::IdCollision(short)) if attempts < MAX_ID_RETRIES => {
                    debug!(short = %short, attempts, "short id collision, retrying");
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Creates links for a batch of originals in one atomic insert.
    ///
    /// Returns the created links in input order. The batch path has no
    /// per-item conflict recovery; any failure aborts the whole batch.
    pub async fn create_batch(&self, originals: &[String], user_id: &str) -> Result<Vec<Link>> {
        let links: Vec<Link> = originals
            .iter()
            .map(|original| Link::new(self.generator.generate(), original, user_id))
            .collect();
        self.repo.insert_batch(&links).await?;
        Ok(links)
    }
}
