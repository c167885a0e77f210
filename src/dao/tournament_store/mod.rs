/// JSON file backend.
pub mod file;
/// In-process backend for tests and ephemeral shows.
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::TournamentDocument, storage::StorageResult};

pub use self::{file::JsonFileStore, memory::MemoryStore};

/// Abstraction over where the tournament snapshot is persisted.
pub trait TournamentStore: Send + Sync {
    /// Read the stored snapshot, `None` when nothing was saved yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>>;
    /// Replace the stored snapshot.
    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend can currently accept writes.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
