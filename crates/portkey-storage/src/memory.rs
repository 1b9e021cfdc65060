use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use portkey_core::{Link, LinkRepository, Result, StorageError, StoreStats};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    original: String,
    user_id: String,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Inner {
    // short -> entry, plus a reverse index enforcing original-uniqueness.
    by_short: HashMap<String, Entry>,
    by_original: HashMap<String, String>,
}

impl Inner {
    fn check_insert(&self, link: &Link) -> Result<()> {
        if self.by_original.contains_key(&link.original) {
            return Err(StorageError::Conflict(link.original.clone()));
        }
        if self.by_short.contains_key(&link.short) {
            return Err(StorageError::IdCollision(link.short.clone()));
        }
        Ok(())
    }

    fn apply_insert(&mut self, link: &Link) {
        self.by_original
            .insert(link.original.clone(), link.short.clone());
        self.by_short.insert(
            link.short.clone(),
            Entry {
                original: link.original.clone(),
                user_id: link.user_id.clone(),
                deleted: link.deleted,
            },
        );
    }

    fn link_for(&self, short: &str, entry: &Entry) -> Link {
        Link {
            short: short.to_string(),
            original: entry.original.clone(),
            user_id: entry.user_id.clone(),
            deleted: entry.deleted,
        }
    }
}

/// Process-local in-memory backend.
///
/// Strictly deduplicates on `original` (the same policy as the database
/// backend) and keeps an explicit tombstone flag per entry. Not durable;
/// everything is lost on restart. A single writer lock serializes
/// mutations against concurrent readers.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from replayed records, last record per short wins.
    ///
    /// Used by the file backend when replaying its journal; tombstone
    /// records overwrite the live record they refer to.
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut inner = Inner::default();
        for link in links {
            // Replay bypasses dedup checks: the journal is the authority.
            if let Some(previous) = inner.by_short.get(&link.short) {
                let stale = previous.original.clone();
                inner.by_original.remove(&stale);
            }
            inner.apply_insert(&link);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Marks the link deleted if `user_id` owns it. Returns whether the
    /// entry was live and owned (i.e. whether anything changed).
    pub(crate) async fn mark_deleted_owned(&self, user_id: &str, short: &str) -> bool {
        let mut inner = self.inner.write().await;
        match inner.by_short.get_mut(short) {
            Some(entry) if entry.user_id == user_id => {
                let changed = !entry.deleted;
                entry.deleted = true;
                changed
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LinkRepository for MemoryRepository {
    async fn insert(&self, link: &Link) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.check_insert(link)?;
        inner.apply_insert(link);
        Ok(())
    }

    async fn insert_batch(&self, links: &[Link]) -> Result<()> {
        let mut inner = self.inner.write().await;
        // Validate the whole batch before touching the maps: all or none.
        let mut seen_originals = HashSet::new();
        let mut seen_shorts = HashSet::new();
        for link in links {
            inner.check_insert(link)?;
            if !seen_originals.insert(link.original.as_str()) {
                return Err(StorageError::Conflict(link.original.clone()));
            }
            if !seen_shorts.insert(link.short.as_str()) {
                return Err(StorageError::IdCollision(link.short.clone()));
            }
        }
        for link in links {
            inner.apply_insert(link);
        }
        Ok(())
    }

    async fn get_by_short(&self, short: &str) -> Result<Link> {
        let inner = self.inner.read().await;
        inner
            .by_short
            .get(short)
            .map(|entry| inner.link_for(short, entry))
            .ok_or_else(|| StorageError::NotFound(short.to_string()))
    }

    async fn get_by_original(&self, original: &str) -> Result<Link> {
        let inner = self.inner.read().await;
        let short = inner
            .by_original
            .get(original)
            .ok_or_else(|| StorageError::NotFound(original.to_string()))?;
        let entry = inner
            .by_short
            .get(short)
            .ok_or_else(|| StorageError::NotFound(original.to_string()))?;
        Ok(inner.link_for(short, entry))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Link>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_short
            .iter()
            .filter(|(_, entry)| entry.user_id == user_id)
            .map(|(short, entry)| inner.link_for(short, entry))
            .collect())
    }

    async fn mark_deleted(&self, user_id: &str, short: &str) -> Result<()> {
        // Silent no-op on unknown shorts and foreign owners.
        self.mark_deleted_owned(user_id, short).await;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.read().await;
        let users = inner
            .by_short
            .values()
            .filter(|entry| !entry.user_id.is_empty())
            .map(|entry| entry.user_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;
        Ok(StoreStats {
            urls: inner.by_short.len() as u64,
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(short: &str, original: &str, user: &str) -> Link {
        Link::new(short, original, user)
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://example.com", "u1"))
            .await
            .unwrap();

        let got = repo.get_by_short("abc").await.unwrap();
        assert_eq!(got.original, "https://example.com");
        assert_eq!(got.user_id, "u1");
        assert!(!got.deleted);

        let by_original = repo.get_by_original("https://example.com").await.unwrap();
        assert_eq!(by_original.short, "abc");
    }

    #[tokio::test]
    async fn duplicate_original_conflicts() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://example.com", "u1"))
            .await
            .unwrap();

        let err = repo
            .insert(&link("xyz", "https://example.com", "u2"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // The first mapping is untouched.
        let got = repo.get_by_original("https://example.com").await.unwrap();
        assert_eq!(got.short, "abc");
        assert_eq!(got.user_id, "u1");
    }

    #[tokio::test]
    async fn duplicate_short_is_a_collision() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://one.example", "u1"))
            .await
            .unwrap();

        let err = repo
            .insert(&link("abc", "https://two.example", "u1"))
            .await
            .unwrap_err();
        assert!(err.is_id_collision());
    }

    #[tokio::test]
    async fn get_unknown_short_is_not_found() {
        let repo = MemoryRepository::new();
        assert!(matches!(
            repo.get_by_short("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn batch_insert_is_all_or_none() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://taken.example", "u1"))
            .await
            .unwrap();

        let batch = vec![
            link("aaa", "https://fresh.example", "u1"),
            link("bbb", "https://taken.example", "u1"),
        ];
        assert!(repo.insert_batch(&batch).await.is_err());

        // The valid half of the batch must not have landed.
        assert!(repo.get_by_short("aaa").await.is_err());
    }

    #[tokio::test]
    async fn mark_deleted_sets_tombstone_once() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://example.com", "u1"))
            .await
            .unwrap();

        repo.mark_deleted("u1", "abc").await.unwrap();
        let got = repo.get_by_short("abc").await.unwrap();
        assert!(got.deleted);
        // The original survives the tombstone.
        assert_eq!(got.original, "https://example.com");

        // Idempotent.
        repo.mark_deleted("u1", "abc").await.unwrap();
        assert!(repo.get_by_short("abc").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn mark_deleted_ignores_foreign_owner() {
        let repo = MemoryRepository::new();
        repo.insert(&link("abc", "https://example.com", "u1"))
            .await
            .unwrap();

        repo.mark_deleted("intruder", "abc").await.unwrap();
        assert!(!repo.get_by_short("abc").await.unwrap().deleted);

        // Unknown shorts are also a silent no-op.
        repo.mark_deleted("u1", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn list_by_user_filters_ownership() {
        let repo = MemoryRepository::new();
        repo.insert(&link("a1", "https://a1.example", "u1"))
            .await
            .unwrap();
        repo.insert(&link("a2", "https://a2.example", "u1"))
            .await
            .unwrap();
        repo.insert(&link("b1", "https://b1.example", "u2"))
            .await
            .unwrap();

        let mut mine: Vec<String> = repo
            .list_by_user("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.short)
            .collect();
        mine.sort();
        assert_eq!(mine, ["a1", "a2"]);

        assert!(repo.list_by_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_counts_urls_and_distinct_users() {
        let repo = MemoryRepository::new();
        repo.insert(&link("a1", "https://a1.example", "u1"))
            .await
            .unwrap();
        repo.insert(&link("a2", "https://a2.example", "u1"))
            .await
            .unwrap();
        repo.insert(&link("b1", "https://b1.example", "u2"))
            .await
            .unwrap();
        repo.insert(&link("c1", "https://c1.example", ""))
            .await
            .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.urls, 4);
        // Anonymous (empty) owners are not users.
        assert_eq!(stats.users, 2);

        // Tombstoned rows still count as URLs.
        repo.mark_deleted("u1", "a1").await.unwrap();
        assert_eq!(repo.stats().await.unwrap().urls, 4);
    }

    #[tokio::test]
    async fn from_links_last_record_wins() {
        let mut tombstone = link("abc", "https://example.com", "u1");
        tombstone.deleted = true;
        let repo = MemoryRepository::from_links(vec![
            link("abc", "https://example.com", "u1"),
            link("xyz", "https://other.example", "u1"),
            tombstone,
        ]);

        assert!(repo.get_by_short("abc").await.unwrap().deleted);
        assert!(!repo.get_by_short("xyz").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_original_admit_exactly_one() {
        use std::sync::Arc;

        let repo = Arc::new(MemoryRepository::new());
        let mut handles = Vec::new();
        for i in 0..10 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.insert(&Link::new(format!("id{i}"), "https://same.example", "u1"))
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }
}
