pub mod bracket;
pub mod draw;
pub mod engine;
mod hub;
pub mod tournament;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::TournamentDocument,
        storage::{StorageError, StorageResult},
        tournament_store::TournamentStore,
    },
    dto::events::ServerEvent,
    error::ServiceError,
    services::notifications,
    state::{
        draw::ContentPools,
        engine::{EngineResult, TournamentEngine},
        tournament::TournamentState,
    },
};

pub use self::hub::ViewerHub;

/// Cheaply clonable handle shared by every handler.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push frames to a connected WebSocket viewer.
pub struct ViewerConnection {
    pub id: Uuid,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// What viewers should hear about a finished mutation.
#[derive(Debug)]
pub enum Announcement {
    /// State changed: persist, send these events, then the full snapshot.
    Changed(Vec<ServerEvent>),
    /// Nothing changed: skip persistence and broadcast.
    Unchanged,
}

impl Announcement {
    /// Collect the events that could be built, skipping those that could not.
    pub fn changed(events: impl IntoIterator<Item = Option<ServerEvent>>) -> Self {
        Announcement::Changed(events.into_iter().flatten().collect())
    }
}

/// Central application state: the engine behind its mutation gate, the store,
/// and every viewer connection.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn TournamentStore>,
    engine: Mutex<TournamentEngine>,
    hub: ViewerHub,
    viewers: DashMap<Uuid, ViewerConnection>,
}

impl AppState {
    /// Restore the persisted tournament, or bootstrap a fresh one from the
    /// configured roster when nothing usable is stored.
    pub async fn initialize(
        config: Arc<AppConfig>,
        store: Arc<dyn TournamentStore>,
        content: ContentPools,
    ) -> Result<SharedState, ServiceError> {
        let content = Arc::new(content);
        let restored = match store.load().await {
            Ok(Some(document)) => {
                match TournamentEngine::restore(
                    document.into_state(),
                    content.clone(),
                    StdRng::from_os_rng(),
                ) {
                    Ok(engine) => Some(engine),
                    Err(err) => {
                        warn!(error = %err, "stored tournament is inconsistent; starting fresh");
                        None
                    }
                }
            }
            Ok(None) => {
                info!("no stored tournament; bootstrapping from defaults");
                None
            }
            Err(err @ StorageError::Corrupt { .. }) => {
                warn!(error = %err, "stored tournament unreadable; starting fresh");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let (mut engine, mut dirty) = match restored {
            Some(engine) => (engine, false),
            None => {
                let engine = TournamentEngine::bootstrap(
                    config.seed_teams(),
                    config.settings.clone(),
                    content,
                    StdRng::from_os_rng(),
                )?;
                (engine, true)
            }
        };

        if engine.normalize(&config.settings) {
            info!("normalized stored tournament");
            dirty = true;
        }
        if dirty {
            store
                .save(TournamentDocument::new(engine.state().clone()))
                .await?;
        }

        Ok(Self::with_engine(config, store, engine))
    }

    /// Wrap an already built engine.
    pub fn with_engine(
        config: Arc<AppConfig>,
        store: Arc<dyn TournamentStore>,
        engine: TournamentEngine,
    ) -> SharedState {
        let hub = ViewerHub::new(config.viewer_channel_capacity);
        Arc::new(Self {
            config,
            store,
            engine: Mutex::new(engine),
            hub,
            viewers: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Copy of the current snapshot.
    pub async fn snapshot(&self) -> TournamentState {
        self.engine.lock().await.state().clone()
    }

    /// Run a read-only closure against the engine.
    pub async fn read_engine<R>(&self, read: impl FnOnce(&TournamentEngine) -> R) -> R {
        let engine = self.engine.lock().await;
        read(&*engine)
    }

    /// Apply one engine operation, then persist and notify viewers.
    ///
    /// The engine lock is held until the broadcast is done, so viewers receive
    /// updates in mutation order. A failed save leaves the change applied and
    /// still notifies viewers before the error is returned.
    pub async fn run_mutation<T, W, A>(&self, work: W, announce: A) -> Result<T, ServiceError>
    where
        W: FnOnce(&mut TournamentEngine) -> EngineResult<T>,
        A: FnOnce(&T, &TournamentState) -> Announcement,
    {
        let mut engine = self.engine.lock().await;
        let value = work(&mut *engine)?;

        let Announcement::Changed(events) = announce(&value, engine.state()) else {
            return Ok(value);
        };

        let saved = self.persist(engine.state()).await;
        for event in events {
            self.broadcast(event);
        }
        if let Some(update) = notifications::state_update(engine.state()) {
            self.broadcast(update);
        }
        drop(engine);

        saved?;
        Ok(value)
    }

    async fn persist(&self, state: &TournamentState) -> StorageResult<()> {
        let result = self
            .store
            .save(TournamentDocument::new(state.clone()))
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "failed to persist tournament state");
        }
        result
    }

    /// Check the storage backend.
    pub async fn storage_health(&self) -> StorageResult<()> {
        self.store.health_check().await
    }

    /// Push an event to every SSE subscriber and WebSocket viewer. Viewers
    /// whose socket is gone are dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        let frame = event.to_ws_text();
        self.viewers.retain(|id, viewer| {
            let delivered = viewer.tx.send(Message::Text(frame.clone().into())).is_ok();
            if !delivered {
                debug!(viewer = %id, "dropping disconnected viewer");
            }
            delivered
        });
        self.hub.broadcast(event);
    }

    /// Subscribe to the event stream used by SSE viewers.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.hub.subscribe()
    }

    /// Register a WebSocket viewer and return its identifier.
    pub fn register_viewer(&self, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        self.viewers.insert(id, ViewerConnection { id, tx });
        id
    }

    /// Forget a WebSocket viewer.
    pub fn remove_viewer(&self, id: &Uuid) {
        self.viewers.remove(id);
    }

    /// Number of connected WebSocket viewers.
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::tournament_store::MemoryStore,
        state::tournament::{MatchId, MatchStatus},
    };

    fn config() -> Arc<AppConfig> {
        Arc::new(AppConfig::default())
    }

    #[tokio::test]
    async fn empty_store_bootstraps_and_persists() {
        let store = MemoryStore::new();
        let state = AppState::initialize(config(), Arc::new(store.clone()), ContentPools::new())
            .await
            .unwrap();

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.leaderboard[0].name, "Manaal & Ahmed");
        assert_eq!(store.stored().unwrap().state, snapshot);
    }

    #[tokio::test]
    async fn stored_tournament_is_restored() {
        let store = MemoryStore::new();
        let first = AppState::initialize(config(), Arc::new(store.clone()), ContentPools::new())
            .await
            .unwrap();
        let winner = first.snapshot().await.leaderboard[0].id;
        first
            .run_mutation(
                |engine| engine.advance_manual(MatchId::Qf1, winner),
                |_, _| Announcement::Changed(Vec::new()),
            )
            .await
            .unwrap();

        let second = AppState::initialize(config(), Arc::new(store), ContentPools::new())
            .await
            .unwrap();
        let snapshot = second.snapshot().await;
        assert_eq!(
            snapshot.find_match(MatchId::Qf1).unwrap().status,
            MatchStatus::Completed
        );
    }

    #[tokio::test]
    async fn tampered_bracket_is_replaced() {
        let store = MemoryStore::new();
        let first = AppState::initialize(config(), Arc::new(store.clone()), ContentPools::new())
            .await
            .unwrap();
        let mut tampered = first.snapshot().await;
        tampered.bracket.swap(0, 1);
        store
            .save(TournamentDocument::new(tampered))
            .await
            .unwrap();

        let second = AppState::initialize(config(), Arc::new(store), ContentPools::new())
            .await
            .unwrap();
        assert_eq!(second.snapshot().await.bracket[0].id, MatchId::Qf1);
    }

    #[tokio::test]
    async fn dead_viewers_are_dropped_on_broadcast() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::initialize(config(), store, ContentPools::new())
            .await
            .unwrap();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        state.register_viewer(live_tx);
        state.register_viewer(dead_tx);
        drop(dead_rx);

        state.broadcast(ServerEvent::json("sfx", &serde_json::json!({"event": "ding"})).unwrap());

        assert_eq!(state.viewer_count(), 1);
        assert!(matches!(live_rx.try_recv(), Ok(Message::Text(_))));
    }
}
