use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::tournament::TournamentState;

/// Version written into every new document.
pub const CURRENT_VERSION: u32 = 1;

/// Envelope persisted around the tournament snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDocument {
    /// Layout version of the document.
    pub version: u32,
    /// Last time the snapshot was written.
    pub saved_at: SystemTime,
    /// The snapshot itself.
    pub state: TournamentState,
}

impl TournamentDocument {
    /// Wrap `state` into a document stamped with the current time.
    pub fn new(state: TournamentState) -> Self {
        Self {
            version: CURRENT_VERSION,
            saved_at: SystemTime::now(),
            state,
        }
    }

    /// Unwrap the snapshot.
    pub fn into_state(self) -> TournamentState {
        self.state
    }
}

/// Any on-disk shape we know how to read: the versioned envelope, or a bare
/// snapshot as written by earlier deployments.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredSnapshot {
    Document(TournamentDocument),
    Bare(TournamentState),
}

impl From<StoredSnapshot> for TournamentDocument {
    fn from(value: StoredSnapshot) -> Self {
        match value {
            StoredSnapshot::Document(document) => document,
            StoredSnapshot::Bare(state) => TournamentDocument::new(state),
        }
    }
}
