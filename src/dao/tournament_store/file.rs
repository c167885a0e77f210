use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::dao::{
    models::{CURRENT_VERSION, StoredSnapshot, TournamentDocument},
    storage::{StorageError, StorageResult},
    tournament_store::TournamentStore,
};

/// Persists the snapshot as a single pretty-printed JSON file.
///
/// Writes go to a sibling temporary file which is flushed and then renamed
/// over the target, so readers never observe a half-written snapshot. The
/// outcome of the latest save is kept for health checks.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    last_failure: Arc<Mutex<Option<String>>>,
}

impl JsonFileStore {
    /// Store the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            last_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Target file of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    async fn read_document(&self) -> StorageResult<Option<TournamentDocument>> {
        let contents = match fs::read_to_string(self.path.as_path()).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("reading `{}`", self.path.display()),
                    err,
                ));
            }
        };

        let stored: StoredSnapshot = serde_json::from_str(&contents).map_err(|err| {
            StorageError::corrupt(format!("`{}`: {err}", self.path.display()))
        })?;
        let document: TournamentDocument = stored.into();
        if document.version != CURRENT_VERSION {
            return Err(StorageError::corrupt(format!(
                "`{}` has unsupported document version {}",
                self.path.display(),
                document.version
            )));
        }
        Ok(Some(document))
    }

    async fn write_document(&self, document: TournamentDocument) -> StorageResult<()> {
        let payload = serde_json::to_vec_pretty(&document).map_err(|err| {
            StorageError::unavailable("serializing tournament snapshot".into(), err)
        })?;

        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).await.map_err(|err| {
                StorageError::unavailable(format!("creating `{}`", parent.display()), err)
            })?;
        }

        let temp = self.temp_path();
        let write_failed =
            |err| StorageError::unavailable(format!("writing `{}`", temp.display()), err);
        let mut file = fs::File::create(&temp).await.map_err(write_failed)?;
        file.write_all(&payload).await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        fs::rename(&temp, self.path.as_path()).await.map_err(|err| {
            StorageError::unavailable(format!("replacing `{}`", self.path.display()), err)
        })?;

        debug!(path = %self.path.display(), bytes = payload.len(), "snapshot saved");
        Ok(())
    }

    fn record_outcome(&self, result: &StorageResult<()>) {
        let mut last = self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = result.as_ref().err().map(ToString::to_string);
    }

    fn last_failure(&self) -> Option<String> {
        self.last_failure
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    async fn check_writable(&self) -> StorageResult<()> {
        if let Some(failure) = self.last_failure() {
            return Err(StorageError::unavailable(
                format!("last save to `{}` failed", self.path.display()),
                std::io::Error::other(failure),
            ));
        }

        let Some(parent) = self.parent_dir() else {
            return Ok(());
        };
        match fs::metadata(parent).await {
            Ok(meta) if meta.permissions().readonly() => Err(StorageError::unavailable(
                format!("`{}` is read-only", parent.display()),
                std::io::Error::from(ErrorKind::PermissionDenied),
            )),
            Ok(_) => Ok(()),
            // Created lazily on first save.
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::unavailable(
                format!("inspecting `{}`", parent.display()),
                err,
            )),
        }
    }
}

impl TournamentStore for JsonFileStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<TournamentDocument>>> {
        let store = self.clone();
        Box::pin(async move { store.read_document().await })
    }

    fn save(&self, document: TournamentDocument) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store.write_document(document).await;
            store.record_outcome(&result);
            result
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check_writable().await })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::{
        draw::ContentPools,
        engine::TournamentEngine,
        tournament::{Settings, Team, TournamentState},
    };

    fn sample_state() -> TournamentState {
        let teams = (1..=8)
            .map(|n| Team::new(format!("Team {n}"), vec![format!("A{n}"), format!("B{n}")]))
            .collect();
        TournamentEngine::bootstrap(
            teams,
            Settings::default(),
            std::sync::Arc::new(ContentPools::new()),
            StdRng::seed_from_u64(1),
        )
        .unwrap()
        .state()
        .clone()
    }

    #[tokio::test]
    async fn absent_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_snapshot_reloads_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data").join("state.json"));
        let state = sample_state();

        store.save(TournamentDocument::new(state.clone())).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.version, CURRENT_VERSION);

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[tokio::test]
    async fn bare_snapshot_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = sample_state();
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let loaded = JsonFileStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.into_state(), state);
    }

    #[tokio::test]
    async fn future_document_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut document = TournamentDocument::new(sample_state());
        document.version = CURRENT_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn failed_save_degrades_health_until_next_success() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonFileStore::new(blocker.join("state.json"));

        let err = store
            .save(TournamentDocument::new(sample_state()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(store.health_check().await.is_err());

        std::fs::remove_file(&blocker).unwrap();
        store
            .save(TournamentDocument::new(sample_state()))
            .await
            .unwrap();
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"bracket\": 12").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
