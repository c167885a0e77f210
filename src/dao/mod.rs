/// Challenge content loading from JSON pools.
pub mod content;
/// Persisted document envelope.
pub mod models;
/// Storage abstraction layer shared by every backend.
pub mod storage;
/// Snapshot persistence backends.
pub mod tournament_store;
