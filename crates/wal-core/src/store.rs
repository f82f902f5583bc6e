//! History store: the bounded history list, its persistence, and the
//! single-slot pending undo with its expiry timer.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{EntryId, HistoryEntry, NormalizedNumber},
    history::History,
    ports::HistoryStorage,
};

/// How long a deleted entry stays restorable.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

struct PendingUndo {
    entry: HistoryEntry,
    cancel: CancellationToken,
}

struct StoreState {
    history: History,
    pending: Option<PendingUndo>,
}

impl StoreState {
    /// Drop the pending undo (if any) without restoring it.
    fn discard_pending(&mut self) -> Option<HistoryEntry> {
        let pending = self.pending.take()?;
        pending.cancel.cancel();
        Some(pending.entry)
    }
}

pub struct HistoryStore {
    storage: Arc<dyn HistoryStorage>,
    undo_window: Duration,
    state: Mutex<StoreState>,
}

impl HistoryStore {
    /// Load persisted history. Unreadable data is logged and treated as empty.
    pub fn open(
        storage: Arc<dyn HistoryStorage>,
        limit: usize,
        undo_window: Duration,
    ) -> Arc<Self> {
        let history = match storage.load() {
            Ok(entries) => History::from_entries(entries, limit),
            Err(e) => {
                tracing::warn!(error = %e, "stored history unreadable, starting empty");
                History::new(limit)
            }
        };
        tracing::debug!(entries = history.len(), "history loaded");

        Arc::new(Self {
            storage,
            undo_window,
            state: Mutex::new(StoreState {
                history,
                pending: None,
            }),
        })
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.entries().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.history.is_empty()
    }

    /// The entry an `undo()` would bring back right now.
    pub async fn pending_undo(&self) -> Option<HistoryEntry> {
        let st = self.state.lock().await;
        st.pending.as_ref().map(|p| p.entry.clone())
    }

    pub async fn insert(
        &self,
        number: NormalizedNumber,
        raw_text_preview: Option<String>,
    ) -> HistoryEntry {
        let mut st = self.state.lock().await;
        let entry = st.history.insert(number, raw_text_preview, Utc::now());
        self.persist(&st.history);
        tracing::debug!(id = %entry.id, number = %entry.number, "history entry added");
        entry
    }

    /// Remove an entry and make it the pending undo.
    ///
    /// A previous pending undo is discarded, not restored, and the expiry
    /// window restarts for the new one. Unknown ids change nothing.
    pub async fn delete(self: &Arc<Self>, id: &EntryId) -> Option<HistoryEntry> {
        let mut st = self.state.lock().await;
        let removed = st.history.remove(id)?;
        if let Some(dropped) = st.discard_pending() {
            tracing::debug!(id = %dropped.id, "pending undo discarded by newer delete");
        }

        let cancel = CancellationToken::new();
        st.pending = Some(PendingUndo {
            entry: removed.clone(),
            cancel: cancel.clone(),
        });
        self.persist(&st.history);
        drop(st);

        self.spawn_expiry(cancel);
        Some(removed)
    }

    /// Restore the pending entry, if it is still pending.
    ///
    /// Returns `None` when nothing is pending, or when a newer entry with the
    /// same number already took its place.
    pub async fn undo(&self) -> Option<HistoryEntry> {
        let mut st = self.state.lock().await;
        let entry = st.discard_pending()?;
        if !st.history.restore(entry.clone()) {
            tracing::info!(
                id = %entry.id,
                number = %entry.number,
                "undo superseded by newer entry"
            );
            return None;
        }
        self.persist(&st.history);
        Some(entry)
    }

    /// Close the undo offer early. The entry stays deleted.
    pub async fn dismiss_undo(&self) -> Option<HistoryEntry> {
        let dropped = self.state.lock().await.discard_pending()?;
        tracing::debug!(id = %dropped.id, "pending undo dismissed");
        Some(dropped)
    }

    /// Empty the history. Any pending undo becomes unrecoverable.
    pub async fn clear(&self) {
        let mut st = self.state.lock().await;
        st.history.clear();
        st.discard_pending();
        self.persist(&st.history);
    }

    fn spawn_expiry(self: &Arc<Self>, cancel: CancellationToken) {
        let store = Arc::clone(self);
        let window = self.undo_window;
        tokio::spawn(async move {
            tokio::select! {
              _ = cancel.cancelled() => {}
              _ = tokio::time::sleep(window) => {
                store.expire(&cancel).await;
              }
            }
        });
    }

    async fn expire(&self, cancel: &CancellationToken) {
        let mut st = self.state.lock().await;
        // Replacement cancels the old token under this same lock.
        if cancel.is_cancelled() {
            return;
        }
        if let Some(dropped) = st.discard_pending() {
            tracing::debug!(id = %dropped.id, "undo window expired");
        }
    }

    fn persist(&self, history: &History) {
        if let Err(e) = self.storage.save(history.entries()) {
            tracing::warn!(error = %e, "failed to persist history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, storage::MemoryStorage, Result};

    fn num(s: &str) -> NormalizedNumber {
        NormalizedNumber::parse(s).unwrap()
    }

    fn store_with(storage: Arc<MemoryStorage>) -> Arc<HistoryStore> {
        HistoryStore::open(storage, 10, DEFAULT_UNDO_WINDOW)
    }

    struct BrokenStorage;

    impl HistoryStorage for BrokenStorage {
        fn load(&self) -> Result<Vec<HistoryEntry>> {
            Err(Error::PersistenceRead("garbage".to_string()))
        }

        fn save(&self, _entries: &[HistoryEntry]) -> Result<()> {
            Err(Error::External("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn unreadable_storage_starts_empty_and_keeps_working() {
        let store = HistoryStore::open(Arc::new(BrokenStorage), 10, DEFAULT_UNDO_WINDOW);
        assert!(store.is_empty().await);

        store.insert(num("44123456"), None).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn every_mutation_is_persisted() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store_with(storage.clone());

        let a = store.insert(num("111111"), None).await;
        store.insert(num("222222"), None).await;
        assert_eq!(storage.snapshot().len(), 2);

        store.delete(&a.id).await;
        assert_eq!(storage.snapshot().len(), 1);

        store.undo().await;
        assert_eq!(storage.snapshot().len(), 2);

        store.clear().await;
        assert!(storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn open_repairs_persisted_duplicates() {
        let earlier = Utc::now() - chrono::Duration::seconds(10);
        let older = HistoryEntry::new(num("111111"), None, earlier);
        let newer = HistoryEntry::new(num("111111"), None, Utc::now());
        let storage = Arc::new(MemoryStorage::with_entries(vec![older, newer.clone()]));

        let store = store_with(storage);
        assert_eq!(store.entries().await, vec![newer]);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_restores_deleted_entry() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        store.insert(num("222222"), None).await;

        assert_eq!(store.delete(&a.id).await, Some(a.clone()));
        assert_eq!(store.pending_undo().await, Some(a.clone()));

        assert_eq!(store.undo().await, Some(a.clone()));
        assert_eq!(store.entries().await[1], a);
        assert_eq!(store.pending_undo().await, None);
        assert_eq!(store.undo().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_delete_discards_first_undo() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        let b = store.insert(num("222222"), None).await;

        store.delete(&a.id).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        store.delete(&b.id).await;

        assert_eq!(store.pending_undo().await, Some(b.clone()));
        assert_eq!(store.undo().await, Some(b.clone()));
        assert_eq!(store.entries().await, vec![b]);
        assert_eq!(store.undo().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_delete_restarts_the_window() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        let b = store.insert(num("222222"), None).await;

        store.delete(&a.id).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        store.delete(&b.id).await;

        // 6s after the first delete, 3s after the second.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.pending_undo().await, Some(b.clone()));

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(store.pending_undo().await, None);
        assert_eq!(store.undo().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn undo_after_window_is_a_noop() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        store.delete(&a.id).await;

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(store.pending_undo().await.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.undo().await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_makes_pending_undo_unrecoverable() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        store.insert(num("222222"), None).await;
        store.delete(&a.id).await;

        store.clear().await;
        assert!(store.is_empty().await);
        assert_eq!(store.pending_undo().await, None);
        assert_eq!(store.undo().await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_undo_is_gone_before_the_window_ends() {
        let storage = Arc::new(MemoryStorage::default());
        let store = store_with(storage.clone());
        let a = store.insert(num("111111"), None).await;
        store.insert(num("222222"), None).await;
        store.delete(&a.id).await;

        assert_eq!(store.dismiss_undo().await, Some(a));
        assert_eq!(store.pending_undo().await, None);
        assert_eq!(store.dismiss_undo().await, None);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.undo().await, None);
        assert_eq!(store.len().await, 1);
        assert_eq!(storage.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_unknown_id_keeps_pending_undo() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        store.delete(&a.id).await;

        assert_eq!(store.delete(&EntryId("missing".to_string())).await, None);
        assert_eq!(store.pending_undo().await, Some(a));
    }

    #[tokio::test(start_paused = true)]
    async fn undo_loses_to_reinserted_number() {
        let store = store_with(Arc::new(MemoryStorage::default()));
        let a = store.insert(num("111111"), None).await;
        store.delete(&a.id).await;
        let again = store.insert(num("111111"), None).await;

        assert_eq!(store.undo().await, None);
        assert_eq!(store.entries().await, vec![again]);
    }
}
