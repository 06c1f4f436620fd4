use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{MemoryError, MemoryResult};
use crate::key::{IdentityHasher, MemoryKey};
use crate::record::{ConversationRecord, Turn};
use crate::retention::{RetentionDecision, RetentionPolicy};
use crate::store::ConversationStore;
use crate::window::ContextWindow;

/// How the history of a [`TurnContext`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrigin {
    /// No record stored for this key.
    Fresh,
    /// Stored record within the retention window.
    Reused,
    /// Stored record was too old and has been deleted.
    Expired,
    /// Stored record could not be decoded and has been deleted.
    Discarded,
    /// The store failed; proceeding without history.
    Degraded,
}

impl HistoryOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryOrigin::Fresh => "fresh",
            HistoryOrigin::Reused => "reused",
            HistoryOrigin::Expired => "expired",
            HistoryOrigin::Discarded => "discarded",
            HistoryOrigin::Degraded => "degraded",
        }
    }
}

/// Memory state carried through one request, from load to persist.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub key: MemoryKey,
    pub origin: HistoryOrigin,
    history: Vec<Turn>,
    window: ContextWindow,
}

impl TurnContext {
    /// Full retained history, chronological.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Turns to replay to the model, oldest first.
    pub fn window(&self) -> &[Turn] {
        self.window.select(&self.history)
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Read path and write path of the conversation memory.
///
/// Per request: resolve key -> load (retention, window) -> caller obtains the
/// reply -> persist. Same-key concurrent requests are last-writer-wins.
#[derive(Clone)]
pub struct MemoryManager {
    store: ConversationStore,
    hasher: IdentityHasher,
    retention: RetentionPolicy,
    window: ContextWindow,
}

impl MemoryManager {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            store,
            hasher: IdentityHasher::default(),
            retention: RetentionPolicy::default(),
            window: ContextWindow::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: IdentityHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn key_for(&self, user_id: &str) -> MemoryKey {
        self.hasher.hash(user_id)
    }

    pub async fn load_context(&self, user_id: &str) -> TurnContext {
        self.load_context_at(user_id, Utc::now()).await
    }

    /// Never fails: every store error degrades to an empty history.
    pub async fn load_context_at(&self, user_id: &str, now: DateTime<Utc>) -> TurnContext {
        let key = self.key_for(user_id);

        let (history, origin) = match self.load_history(key, now).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(memory_key = %key, "Failed to load conversation, continuing without history: {}", e);
                (Vec::new(), HistoryOrigin::Degraded)
            }
        };

        let context = TurnContext {
            key,
            origin,
            history,
            window: self.window,
        };

        debug!(
            memory_key = %key,
            origin = origin.as_str(),
            stored = context.history.len(),
            replayed = context.window().len(),
            window = self.window.size(),
            "Conversation context loaded"
        );

        context
    }

    async fn load_history(
        &self,
        key: MemoryKey,
        now: DateTime<Utc>,
    ) -> MemoryResult<(Vec<Turn>, HistoryOrigin)> {
        if !self.store.exists(key).await? {
            return Ok((Vec::new(), HistoryOrigin::Fresh));
        }

        // Unknown age counts as fresh enough
        if let Some(last_modified) = self.store.last_modified(key).await? {
            if self.retention.decide(last_modified, now) == RetentionDecision::Expire {
                info!(
                    memory_key = %key,
                    "Conversation older than {} minutes, starting fresh",
                    self.retention.window().num_minutes()
                );
                if let Err(e) = self.store.delete(key).await {
                    warn!(memory_key = %key, "Failed to delete expired conversation: {}", e);
                }
                return Ok((Vec::new(), HistoryOrigin::Expired));
            }
        }

        match self.store.read(key).await {
            Ok(record) => Ok((record.turns, HistoryOrigin::Reused)),
            Err(MemoryError::NotFound { .. }) => Ok((Vec::new(), HistoryOrigin::Fresh)),
            Err(e @ MemoryError::MalformedRecord { .. }) => {
                warn!(memory_key = %key, "Discarding unreadable conversation: {}", e);
                if let Err(e) = self.store.delete(key).await {
                    warn!(memory_key = %key, "Failed to delete unreadable conversation: {}", e);
                }
                Ok((Vec::new(), HistoryOrigin::Discarded))
            }
            Err(e) => Err(e),
        }
    }

    /// Append one turn and write the whole record back under the same key.
    ///
    /// A degraded load is retried first so a transient read failure cannot
    /// overwrite the stored history with a single turn.
    pub async fn persist_turn(
        &self,
        context: TurnContext,
        user_text: &str,
        assistant_text: &str,
    ) -> MemoryResult<ConversationRecord> {
        let now = Utc::now();
        let key = context.key;

        let turns = match context.origin {
            HistoryOrigin::Degraded => {
                let (history, origin) = self.load_history(key, now).await?;
                debug!(memory_key = %key, origin = origin.as_str(), "Reloaded history before persist");
                history
            }
            _ => context.history,
        };

        let mut record = ConversationRecord::with_turns(key, turns);
        record.push(Turn::new(user_text, assistant_text, now));

        self.store.write(key, &record).await?;
        record.last_modified = Some(now);

        info!(memory_key = %key, turns = record.len(), "Conversation persisted");
        Ok(record)
    }

    /// Drop a user's record. Idempotent.
    pub async fn forget(&self, user_id: &str) -> MemoryResult<MemoryKey> {
        let key = self.key_for(user_id);
        self.store.delete(key).await?;
        info!(memory_key = %key, "Conversation forgotten");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::key::KeyScheme;
    use crate::store::{MemoryObjectStore, ObjectMeta, ObjectStore};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const USER: &str = "U0123456789abcdef";

    /// Wraps the in-memory store and fails on demand.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryObjectStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self, flag: &AtomicBool) -> Result<(), TransportError> {
            if flag.load(Ordering::SeqCst) {
                return Err(TransportError::Other("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn head(&self, path: &str) -> Result<Option<ObjectMeta>, TransportError> {
            self.check(&self.fail_reads)?;
            self.inner.head(path).await
        }

        async fn get(&self, path: &str) -> Result<Option<Bytes>, TransportError> {
            self.check(&self.fail_reads)?;
            self.inner.get(path).await
        }

        async fn put(&self, path: &str, data: Bytes) -> Result<(), TransportError> {
            self.check(&self.fail_writes)?;
            self.inner.put(path, data).await
        }

        async fn delete(&self, path: &str) -> Result<(), TransportError> {
            self.check(&self.fail_writes)?;
            self.inner.delete(path).await
        }
    }

    fn manager_with(backend: Arc<dyn ObjectStore>, window: usize) -> MemoryManager {
        MemoryManager::new(ConversationStore::new(backend)).with_window(ContextWindow::new(window))
    }

    fn labels(turns: &[Turn]) -> Vec<&str> {
        turns.iter().map(|t| t.user_text.as_str()).collect()
    }

    async fn seed(manager: &MemoryManager, labels: &[&str]) {
        for label in labels {
            let ctx = manager.load_context(USER).await;
            manager
                .persist_turn(ctx, label, &format!("re: {}", label))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_first_turn_for_new_user() {
        let manager = manager_with(Arc::new(MemoryObjectStore::new()), 2);

        let ctx = manager.load_context(USER).await;
        assert_eq!(ctx.origin, HistoryOrigin::Fresh);
        assert!(ctx.window().is_empty());

        let record = manager.persist_turn(ctx, "hello", "hi there").await.unwrap();
        assert_eq!(record.len(), 1);

        let stored = manager.store().read(manager.key_for(USER)).await.unwrap();
        assert_eq!(stored.turns.len(), 1);
        assert_eq!(stored.turns[0].assistant_text, "hi there");
        assert!(stored.turns[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_window_trims_only_at_selection() {
        let manager = manager_with(Arc::new(MemoryObjectStore::new()), 2);
        seed(&manager, &["A", "B", "C"]).await;

        let ctx = manager.load_context(USER).await;
        assert_eq!(ctx.origin, HistoryOrigin::Reused);
        assert_eq!(labels(ctx.window()), vec!["B", "C"]);

        manager.persist_turn(ctx, "D", "re: D").await.unwrap();

        let stored = manager.store().read(manager.key_for(USER)).await.unwrap();
        assert_eq!(labels(&stored.turns), vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted_and_absent() {
        let backend = Arc::new(MemoryObjectStore::new());
        let manager = manager_with(backend.clone(), 3);
        seed(&manager, &["A", "B"]).await;

        let path = manager.store().path_for(manager.key_for(USER));
        let now = Utc::now();

        backend.set_last_modified(&path, now - Duration::hours(2) - Duration::minutes(59));
        let ctx = manager.load_context_at(USER, now).await;
        assert_eq!(ctx.origin, HistoryOrigin::Reused);
        assert_eq!(ctx.history().len(), 2);

        backend.set_last_modified(&path, now - Duration::hours(3) - Duration::minutes(1));
        let ctx = manager.load_context_at(USER, now).await;
        assert_eq!(ctx.origin, HistoryOrigin::Expired);
        assert!(ctx.window().is_empty());
        assert!(!manager.store().exists(manager.key_for(USER)).await.unwrap());

        let record = manager.persist_turn(ctx, "C", "re: C").await.unwrap();
        assert_eq!(labels(&record.turns), vec!["C"]);
    }

    #[tokio::test]
    async fn test_malformed_record_is_discarded() {
        let backend = Arc::new(MemoryObjectStore::new());
        let manager = manager_with(backend.clone(), 3);
        let path = manager.store().path_for(manager.key_for(USER));
        backend
            .put(&path, Bytes::from_static(b"{\"user\": \"half"))
            .await
            .unwrap();

        let ctx = manager.load_context(USER).await;

        assert_eq!(ctx.origin, HistoryOrigin::Discarded);
        assert!(ctx.is_empty());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_forget_starts_fresh_record() {
        let manager = manager_with(Arc::new(MemoryObjectStore::new()), 3);
        seed(&manager, &["A", "B"]).await;

        let key = manager.forget(USER).await.unwrap();
        assert!(!manager.store().exists(key).await.unwrap());
        manager.forget(USER).await.unwrap();

        let ctx = manager.load_context(USER).await;
        assert_eq!(ctx.origin, HistoryOrigin::Fresh);
        let record = manager.persist_turn(ctx, "new", "start").await.unwrap();
        assert_eq!(record.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_on_load_degrades() {
        let backend = Arc::new(FlakyStore::default());
        let manager = manager_with(backend.clone(), 3);
        seed(&manager, &["A", "B"]).await;

        backend.fail_reads.store(true, Ordering::SeqCst);
        let ctx = manager.load_context(USER).await;
        assert_eq!(ctx.origin, HistoryOrigin::Degraded);
        assert!(ctx.window().is_empty());

        // Store recovered before the write: history is kept
        backend.fail_reads.store(false, Ordering::SeqCst);
        let record = manager.persist_turn(ctx, "C", "re: C").await.unwrap();
        assert_eq!(labels(&record.turns), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_degraded_persist_does_not_clobber_history() {
        let backend = Arc::new(FlakyStore::default());
        let manager = manager_with(backend.clone(), 3);
        seed(&manager, &["A", "B"]).await;

        backend.fail_reads.store(true, Ordering::SeqCst);
        let ctx = manager.load_context(USER).await;
        let err = manager.persist_turn(ctx, "C", "re: C").await.unwrap_err();
        assert!(err.is_transport());

        backend.fail_reads.store(false, Ordering::SeqCst);
        let stored = manager.store().read(manager.key_for(USER)).await.unwrap();
        assert_eq!(labels(&stored.turns), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced() {
        let backend = Arc::new(FlakyStore::default());
        let manager = manager_with(backend.clone(), 3);

        backend.fail_writes.store(true, Ordering::SeqCst);
        let ctx = manager.load_context(USER).await;
        let err = manager.persist_turn(ctx, "A", "re: A").await.unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_distinct_users_do_not_share_history() {
        let manager = manager_with(Arc::new(MemoryObjectStore::new()), 3)
            .with_hasher(IdentityHasher::new(KeyScheme::Sha256));
        seed(&manager, &["A"]).await;

        let other = manager.load_context("U_other_user").await;
        assert_eq!(other.origin, HistoryOrigin::Fresh);
        assert_ne!(other.key, manager.key_for(USER));
    }
}
