use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portkey_core::{Link, LinkRepository, Result, StorageError, StoreStats};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::memory::MemoryRepository;

/// File-backed store: an in-memory map plus an append-only ND-JSON journal.
///
/// Every mutation appends one record per link to the journal; construction
/// replays the journal to rebuild the map, last record per short winning.
/// Deletions append tombstone records (`is_deleted: true`) so they survive
/// a restart. The journal grows monotonically; compaction is out of scope.
pub struct FileRepository {
    mem: MemoryRepository,
    // Serializes mutations; the append happens while this lock is held so
    // journal order always matches map order.
    journal: Mutex<File>,
    path: PathBuf,
}

impl FileRepository {
    /// Opens (creating if needed) the journal at `path` and replays it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mem = MemoryRepository::from_links(replay(&path).await?);
        let journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::Io(format!("open journal {}: {e}", path.display())))?;
        Ok(Self {
            mem,
            journal: Mutex::new(journal),
            path,
        })
    }

    /// The journal location this store was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, journal: &mut File, link: &Link) -> Result<()> {
        let mut line = serde_json::to_string(link)
            .map_err(|e| StorageError::Io(format!("encode journal record: {e}")))?;
        line.push('\n');
        journal
            .write_all(line.as_bytes())
            .await
            .map_err(|e| StorageError::Io(format!("append journal record: {e}")))?;
        journal
            .flush()
            .await
            .map_err(|e| StorageError::Io(format!("flush journal: {e}")))
    }
}

/// Reads every record from the journal, skipping unparsable lines.
async fn replay(path: &Path) -> Result<Vec<Link>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StorageError::Io(format!(
                "read journal {}: {e}",
                path.display()
            )))
        }
    };

    let mut links = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Link>(line) {
            Ok(link) => links.push(link),
            Err(e) => warn!(line = number + 1, error = %e, "skipping bad journal record"),
        }
    }
    Ok(links)
}

#[async_trait]
impl LinkRepository for FileRepository {
    async fn insert(&self, link: &Link) -> Result<()> {
        let mut journal = self.journal.lock().await;
        self.mem.insert(link).await?;
        self.append(&mut journal, link).await
    }

    async fn insert_batch(&self, links: &[Link]) -> Result<()> {
        let mut journal = self.journal.lock().await;
        self.mem.insert_batch(links).await?;
        for link in links {
            self.append(&mut journal, link).await?;
        }
        Ok(())
    }

    async fn get_by_short(&self, short: &str) -> Result<Link> {
        self.mem.get_by_short(short).await
    }

    async fn get_by_original(&self, original: &str) -> Result<Link> {
        self.mem.get_by_original(original).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Link>> {
        self.mem.list_by_user(user_id).await
    }

    async fn mark_deleted(&self, user_id: &str, short: &str) -> Result<()> {
        let mut journal = self.journal.lock().await;
        if !self.mem.mark_deleted_owned(user_id, short).await {
            // Unknown short, foreign owner, or already tombstoned:
            // nothing to journal.
            return Ok(());
        }
        let mut tombstone = self.mem.get_by_short(short).await?;
        tombstone.deleted = true;
        self.append(&mut journal, &tombstone).await
    }

    async fn ping(&self) -> Result<()> {
        self.mem.ping().await
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.mem.stats().await
    }
}
