use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;

use crate::dao::{
    models::TournamentDocument,
    storage::{StorageError, StorageResult},
    tournament_store::TournamentStore,
};

/// Keeps the snapshot in process memory. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Arc<Mutex<Option<TournamentDocument>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save and health check fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of the last saved document.
    pub fn stored(&self) -> Option<TournamentDocument> {
        self.document
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store switched to failing".into(),
                std::io::Error::other("simulated outage"),
            ));
        }
        Ok(())
    }

    fn put(&self, document: TournamentDocument) -> StorageResult<()> {
        self.ensure_available()?;
        let mut guard = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(document);
        Ok(())
    }
}

impl TournamentStore for MemoryStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>> {
        let document = self.stored();
        Box::pin(async move { Ok(document) })
    }

    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.put(document);
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.ensure_available();
        Box::pin(async move { result })
    }
}
