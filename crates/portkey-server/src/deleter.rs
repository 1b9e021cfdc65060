use std::sync::Arc;

use portkey_core::LinkRepository;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Fixed fan-out width of the deletion pipeline.
pub const WORKERS: usize = 5;

/// Marks every short in `shorts` as deleted on behalf of `user_id`.
///
/// Fan-out: the input splits into worker-sized chunks, each worker calls
/// `mark_deleted` per short and emits a boolean per short onto its own
/// channel. Fan-in: a multiplexer drains the worker channels into one
/// result channel, which this function consumes purely to block until
/// every worker completes. Failures are logged, never surfaced; the
/// storage silently refuses cross-user marks. Returns the number of
/// successful calls.
///
/// `shutdown` short-circuits every worker; dropping this future cancels
/// the pipeline the same way (the done channel closes with it).
pub async fn delete_user_urls(
    storage: Arc<dyn LinkRepository>,
    user_id: String,
    shorts: Vec<String>,
    shutdown: watch::Receiver<bool>,
) -> usize {
    if shorts.is_empty() {
        return 0;
    }

    // Closing this (by returning or being dropped) stops every worker.
    let (done_tx, done_rx) = watch::channel(false);

    let chunk_size = shorts.len().div_ceil(WORKERS);
    let mut worker_channels = Vec::new();

    for chunk in shorts.chunks(chunk_size) {
        let (tx, rx) = mpsc::channel::<bool>(chunk.len());
        worker_channels.push(rx);

        let storage = Arc::clone(&storage);
        let user_id = user_id.clone();
        let chunk: Vec<String> = chunk.to_vec();
        let mut done = done_rx.clone();
        let mut shutdown = shutdown.clone();

        tokio::spawn(async move {
            for short in chunk {
                tokio::select! {
                    _ = done.changed() => return,
                    _ = shutdown.changed() => return,
                    result = storage.mark_deleted(&user_id, &short) => {
                        let ok = result.is_ok();
                        if !ok {
                            warn!(short = %short, "failed to mark URL as deleted");
                        }
                        if tx.send(ok).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }

    // Fan-in: forward every worker channel into one result channel.
    let (final_tx, mut final_rx) = mpsc::channel::<bool>(shorts.len());
    for mut rx in worker_channels {
        let final_tx = final_tx.clone();
        tokio::spawn(async move {
            while let Some(ok) = rx.recv().await {
                if final_tx.send(ok).await.is_err() {
                    return;
                }
            }
        });
    }
    drop(final_tx);

    // Drain to completion; this is what delays the 202 until the workers
    // are finished.
    let mut marked = 0;
    while let Some(ok) = final_rx.recv().await {
        if ok {
            marked += 1;
        }
    }

    drop(done_tx);
    marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use portkey_core::Link;
    use portkey_storage::MemoryRepository;

    async fn seeded(user: &str, count: usize) -> (Arc<MemoryRepository>, Vec<String>) {
        let repo = Arc::new(MemoryRepository::new());
        let mut shorts = Vec::new();
        for i in 0..count {
            let short = format!("s{i}");
            repo.insert(&Link::new(&short, format!("https://{i}.example"), user))
                .await
                .unwrap();
            shorts.push(short);
        }
        (repo, shorts)
    }

    // The sender must stay alive for the run; a dropped shutdown channel
    // reads as process exit and cancels the workers.
    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn deletes_every_short_exactly_once() {
        let (repo, shorts) = seeded("u1", 17).await;

        let (_guard, shutdown) = no_shutdown();
        let marked = delete_user_urls(
            repo.clone() as Arc<dyn LinkRepository>,
            "u1".into(),
            shorts.clone(),
            shutdown,
        )
        .await;

        assert_eq!(marked, 17);
        for short in &shorts {
            assert!(repo.get_by_short(short).await.unwrap().deleted);
        }
    }

    #[tokio::test]
    async fn cross_user_shorts_are_left_alone() {
        let (repo, mut shorts) = seeded("u1", 3).await;
        repo.insert(&Link::new("theirs", "https://other.example", "u2"))
            .await
            .unwrap();
        shorts.push("theirs".into());

        let (_guard, shutdown) = no_shutdown();
        delete_user_urls(
            repo.clone() as Arc<dyn LinkRepository>,
            "u1".into(),
            shorts,
            shutdown,
        )
        .await;

        assert!(!repo.get_by_short("theirs").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn duplicate_shorts_are_idempotent() {
        let (repo, _) = seeded("u1", 1).await;

        let (_guard, shutdown) = no_shutdown();
        let marked = delete_user_urls(
            repo.clone() as Arc<dyn LinkRepository>,
            "u1".into(),
            vec!["s0".into(), "s0".into(), "s0".into()],
            shutdown,
        )
        .await;

        // Every mark_deleted call reports success; the tombstone is set once.
        assert_eq!(marked, 3);
        assert!(repo.get_by_short("s0").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn empty_input_completes_immediately() {
        let (repo, _) = seeded("u1", 0).await;
        let (_guard, shutdown) = no_shutdown();
        let marked = delete_user_urls(
            repo as Arc<dyn LinkRepository>,
            "u1".into(),
            Vec::new(),
            shutdown,
        )
        .await;
        assert_eq!(marked, 0);
    }
}
