//! Application-level configuration loading: file locations, storage backend,
//! default settings and the roster used when no tournament exists yet.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::state::tournament::{ScoringRule, Settings, Team, Theme};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLASH_BACK_CONFIG_PATH";
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_STATE_PATH: &str = "data/state.json";
const DEFAULT_VIEWER_CAPACITY: usize = 64;

/// Couples seeded into the bracket when nothing else is configured.
const DEFAULT_COUPLES: [(&str, &str); 8] = [
    ("Manaal", "Ahmed"),
    ("Samia", "Rafay"),
    ("Shahir", "Laibah"),
    ("Rafay", "Anum"),
    ("Sadia", "Daniyaal"),
    ("Maaz", "Misbah"),
    ("Javeria", "Osama"),
    ("Dua", "Amal"),
];

/// Where the tournament snapshot is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Single JSON file at [`AppConfig::state_path`].
    #[default]
    File,
    /// Process memory only.
    Memory,
}

/// Team entry of the configured default roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeamSeed {
    /// Display name.
    pub name: String,
    /// Member names.
    #[serde(default)]
    pub players: Vec<String>,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding the challenge pools.
    pub content_dir: PathBuf,
    /// Snapshot file used by the file store.
    pub state_path: PathBuf,
    /// Selected storage backend.
    pub storage: StorageKind,
    /// Settings applied to a freshly bootstrapped tournament.
    pub settings: Settings,
    /// Roster applied to a freshly bootstrapped tournament.
    pub default_teams: Vec<TeamSeed>,
    /// Buffer size of the viewer broadcast channel.
    pub viewer_channel_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        storage = ?app_config.storage,
                        teams = app_config.default_teams.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Absent fields keep their defaults.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Fresh teams, with new identifiers, for the configured default roster.
    pub fn seed_teams(&self) -> Vec<Team> {
        self.default_teams
            .iter()
            .map(|seed| Team::new(seed.name.clone(), seed.players.clone()))
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            storage: StorageKind::default(),
            settings: Settings::default(),
            default_teams: default_teams(),
            viewer_channel_capacity: DEFAULT_VIEWER_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    content_dir: Option<PathBuf>,
    state_path: Option<PathBuf>,
    storage: Option<StorageKind>,
    best_of: Option<u32>,
    timers: Option<IndexMap<Theme, u32>>,
    scoring: Option<ScoringRule>,
    default_teams: Option<Vec<TeamSeed>>,
    viewer_channel_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let mut settings = defaults.settings;
        if let Some(best_of) = value.best_of.filter(|rounds| *rounds > 0) {
            settings.best_of = best_of;
        }
        if let Some(timers) = value.timers {
            settings.timers.extend(timers);
        }
        if let Some(scoring) = value.scoring {
            match scoring.validate() {
                Ok(()) => settings.scoring = scoring,
                Err(err) => warn!(error = %err, "scoring out of range; keeping defaults"),
            }
        }

        Self {
            content_dir: value.content_dir.unwrap_or(defaults.content_dir),
            state_path: value.state_path.unwrap_or(defaults.state_path),
            storage: value.storage.unwrap_or(defaults.storage),
            settings,
            default_teams: value
                .default_teams
                .filter(|teams| !teams.is_empty())
                .unwrap_or(defaults.default_teams),
            viewer_channel_capacity: value
                .viewer_channel_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.viewer_channel_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_teams() -> Vec<TeamSeed> {
    DEFAULT_COUPLES
        .iter()
        .map(|(first, second)| TeamSeed {
            name: format!("{first} & {second}"),
            players: vec![(*first).to_string(), (*second).to_string()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_a_full_bracket() {
        let config = AppConfig::default();
        assert_eq!(config.default_teams.len(), 8);
        assert_eq!(config.default_teams[0].name, "Manaal & Ahmed");
        assert_eq!(config.default_teams[7].players, vec!["Dua", "Amal"]);
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.settings.best_of, 5);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = AppConfig::from_json_str(
            r#"{
                "storage": "memory",
                "bestOf": 3,
                "timers": {"emoji": 30},
                "contentDir": "/srv/clash/content"
            }"#,
        )
        .unwrap();

        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.settings.best_of, 3);
        assert_eq!(config.settings.timers[&Theme::Emoji], 30);
        assert_eq!(config.settings.timers[&Theme::Lyrics], 10);
        assert_eq!(config.content_dir, PathBuf::from("/srv/clash/content"));
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert_eq!(config.viewer_channel_capacity, DEFAULT_VIEWER_CAPACITY);
    }

    #[test]
    fn seeded_teams_get_distinct_ids() {
        let teams = AppConfig::default().seed_teams();
        assert_eq!(teams.len(), 8);
        assert_ne!(teams[0].id, teams[1].id);
        assert!(teams.iter().all(|team| team.score == 0));
    }

    #[test]
    fn out_of_range_scoring_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{"scoring": {"perCorrect": 3000000000, "winBonus": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.settings.scoring, ScoringRule::default());

        let config =
            AppConfig::from_json_str(r#"{"scoring": {"perCorrect": 2, "winBonus": 5}}"#).unwrap();
        assert_eq!(config.settings.scoring.per_correct, 2);
        assert_eq!(config.settings.scoring.win_bonus, 5);
    }

    #[test]
    fn unknown_storage_kind_is_rejected() {
        assert!(AppConfig::from_json_str(r#"{"storage": "mongo"}"#).is_err());
    }
}
