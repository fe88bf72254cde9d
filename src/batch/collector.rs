//! Debounced fragment aggregation.
//!
//! Telegram delivers an album as separate messages sharing a
//! `media_group_id`. The collector gathers them per group; the first
//! fragment of a group arms a timer and when it fires the whole group is
//! taken out of the map in one step and handed to the finalize handler.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Called once per flushed group with fragments in sequence order.
pub type FinalizeHandler<T> =
    Arc<dyn Fn(String, Vec<T>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// One collected item and its ordering key.
struct Fragment<T> {
    sequence: i64,
    item: T,
}

/// Generic per-group fragment aggregator.
pub struct BatchCollector<T> {
    name: &'static str,
    groups: Arc<DashMap<String, Vec<Fragment<T>>>>,
    debounce: Duration,
    max_fragments: usize,
    handler: FinalizeHandler<T>,
    shutdown: CancellationToken,
}

impl<T> Clone for BatchCollector<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            groups: Arc::clone(&self.groups),
            debounce: self.debounce,
            max_fragments: self.max_fragments,
            handler: Arc::clone(&self.handler),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> BatchCollector<T> {
    pub fn new(
        name: &'static str,
        debounce: Duration,
        max_fragments: usize,
        handler: FinalizeHandler<T>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name,
            groups: Arc::new(DashMap::new()),
            debounce,
            max_fragments: max_fragments.max(1),
            handler,
            shutdown,
        }
    }

    /// Add a fragment to its group.
    ///
    /// Returns `true` only for the insert that created the group; the caller
    /// arms the finalize timer on that. Fragments past the size cap are
    /// dropped silently.
    pub fn submit_fragment(&self, group_id: &str, sequence: i64, item: T) -> bool {
        match self.groups.entry(group_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let fragments = entry.get_mut();
                if fragments.len() >= self.max_fragments {
                    debug!(
                        "[{}] group {} full ({}), dropping fragment {}",
                        self.name, group_id, self.max_fragments, sequence
                    );
                    return false;
                }
                let pos = fragments.partition_point(|f| f.sequence <= sequence);
                fragments.insert(pos, Fragment { sequence, item });
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![Fragment { sequence, item }]);
                debug!("[{}] new group {}", self.name, group_id);
                true
            }
        }
    }

    /// Submit a fragment and arm the debounce timer if it opened the group.
    pub fn collect(&self, group_id: &str, sequence: i64, item: T) {
        if self.submit_fragment(group_id, sequence, item) {
            self.schedule_finalize(group_id.to_string());
        }
    }

    /// Finalize `group_id` once the debounce window has passed.
    ///
    /// Shutdown drops the pending group without calling the handler.
    pub fn schedule_finalize(&self, group_id: String) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = this.shutdown.cancelled() => {
                    debug!("[{}] shutdown, dropping group {}", this.name, group_id);
                    return;
                }
                _ = tokio::time::sleep(this.debounce) => {}
            }
            this.finalize(&group_id);
        });
    }

    /// Take the group out of the map and hand it to the handler.
    ///
    /// Returns `false` when there was nothing to flush (already flushed or
    /// never seen). The handler runs on its own task; its errors are logged.
    pub fn finalize(&self, group_id: &str) -> bool {
        let fragments = match self.groups.remove(group_id) {
            Some((_, fragments)) if !fragments.is_empty() => fragments,
            _ => {
                debug!("[{}] nothing to flush for group {}", self.name, group_id);
                return false;
            }
        };

        let items: Vec<T> = fragments.into_iter().map(|f| f.item).collect();
        debug!("[{}] flushing group {} ({} fragments)", self.name, group_id, items.len());

        let handler = Arc::clone(&self.handler);
        let name = self.name;
        let group_id = group_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = handler(group_id.clone(), items).await {
                error!("[{}] handler failed for group {}: {:#}", name, group_id, e);
            }
        });

        true
    }

    /// Number of groups still collecting.
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tokio::sync::mpsc;

    type Flushed = (String, Vec<&'static str>);

    fn collector(
        max: usize,
        shutdown: CancellationToken,
    ) -> (BatchCollector<&'static str>, mpsc::UnboundedReceiver<Flushed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: FinalizeHandler<&'static str> =
            Arc::new(move |group: String, items: Vec<&'static str>| {
                let tx = tx.clone();
                async move {
                    tx.send((group, items))?;
                    Ok::<(), anyhow::Error>(())
                }
                .boxed()
            });
        let c = BatchCollector::new("test", Duration::from_secs(2), max, handler, shutdown);
        (c, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushes_once_in_sequence_order() {
        let (c, mut rx) = collector(10, CancellationToken::new());

        c.collect("g1", 12, "c");
        c.collect("g1", 10, "a");
        tokio::time::sleep(Duration::from_millis(500)).await;
        c.collect("g1", 11, "b");

        let (group, items) = rx.recv().await.unwrap();
        assert_eq!(group, "g1");
        assert_eq!(items, vec!["a", "b", "c"]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(c.pending_groups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_of_group_reported_once() {
        let (c, _rx) = collector(10, CancellationToken::new());

        assert!(c.submit_fragment("g", 1, "a"));
        assert!(!c.submit_fragment("g", 2, "b"));
        assert!(!c.submit_fragment("g", 3, "c"));
        assert!(c.submit_fragment("other", 1, "x"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_fragment_starts_fresh_group() {
        let (c, mut rx) = collector(10, CancellationToken::new());

        c.collect("g", 1, "a");
        c.collect("g", 2, "b");
        let (_, first) = rx.recv().await.unwrap();
        assert_eq!(first, vec!["a", "b"]);

        c.collect("g", 3, "late");
        let (_, second) = rx.recv().await.unwrap();
        assert_eq!(second, vec!["late"]);
    }

    #[tokio::test]
    async fn test_finalize_absent_group_is_noop() {
        let (c, mut rx) = collector(10, CancellationToken::new());

        assert!(!c.finalize("missing"));
        assert!(c.submit_fragment("g", 1, "a"));
        assert!(c.finalize("g"));
        assert!(!c.finalize("g"));

        let (_, items) = rx.recv().await.unwrap();
        assert_eq!(items, vec!["a"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_is_dropped() {
        let (c, mut rx) = collector(2, CancellationToken::new());

        c.collect("g", 1, "a");
        c.collect("g", 2, "b");
        c.collect("g", 3, "c");

        let (_, items) = rx.recv().await.unwrap();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_group() {
        let shutdown = CancellationToken::new();
        let (c, mut rx) = collector(10, shutdown.clone());

        c.collect("g", 1, "a");
        shutdown.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(rx.try_recv().is_err());
    }
}
