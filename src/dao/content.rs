//! Loads the per-theme challenge pools from the content directory.

use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::{
    draw::ContentPools,
    tournament::{Challenge, Theme},
};

/// Errors raised while reading content files.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The file exists but could not be read.
    #[error("failed to read content file `{path}`")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of challenges.
    #[error("failed to parse content file `{path}`")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

/// File holding the pool of `theme`, relative to the content directory.
pub fn file_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Lyrics => "lyrics.json",
        Theme::Scene => "scenes.json",
        Theme::Emoji => "emojis.json",
        Theme::Trivia => "trivia.json",
    }
}

#[derive(Debug, Deserialize)]
struct RawChallenge {
    id: String,
    #[serde(default)]
    theme: Option<Theme>,
    prompt: String,
    answer: String,
    #[serde(default)]
    metadata: Option<IndexMap<String, String>>,
}

/// Load every theme pool from `dir`. A missing file yields an empty pool.
pub async fn load_all(dir: &Path) -> Result<ContentPools, ContentError> {
    let mut pools = ContentPools::new();
    let mut seen_ids = HashSet::new();

    for theme in Theme::ALL {
        let path = dir.join(file_name(theme));
        let pool = load_theme(&path, theme).await?;

        for challenge in &pool {
            if !seen_ids.insert(challenge.id.clone()) {
                warn!(
                    id = %challenge.id,
                    %theme,
                    "duplicate challenge id across pools; draws may be deduplicated together"
                );
            }
        }
        info!(%theme, count = pool.len(), path = %path.display(), "loaded challenge pool");
        pools.insert(theme, pool);
    }

    Ok(pools)
}

async fn load_theme(path: &Path, theme: Theme) -> Result<Vec<Challenge>, ContentError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(%theme, path = %path.display(), "content file not found; pool is empty");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ContentError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let raw: Vec<RawChallenge> =
        serde_json::from_str(&contents).map_err(|source| ContentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(raw
        .into_iter()
        .map(|item| {
            if let Some(declared) = item.theme.filter(|declared| *declared != theme) {
                warn!(
                    id = %item.id,
                    %declared,
                    file_theme = %theme,
                    "challenge declares another theme; using the pool it was loaded from"
                );
            }
            Challenge {
                id: item.id,
                theme,
                prompt: item.prompt,
                answer: item.answer,
                metadata: item.metadata,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_give_empty_pools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("trivia.json"),
            r#"[{"id":"t1","theme":"trivia","prompt":"Capital?","answer":"Islamabad"}]"#,
        )
        .unwrap();

        let pools = load_all(dir.path()).await.unwrap();
        assert_eq!(pools.len(), 4);
        assert!(pools[&Theme::Lyrics].is_empty());
        assert_eq!(pools[&Theme::Trivia][0].answer, "Islamabad");
    }

    #[tokio::test]
    async fn pool_theme_wins_over_declared_theme() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("emojis.json"),
            r#"[
                {"id":"e1","theme":"scene","prompt":"🦁👑","answer":"The Lion King",
                 "metadata":{"hint":"Disney"}},
                {"id":"e2","prompt":"🚢🧊","answer":"Titanic"}
            ]"#,
        )
        .unwrap();

        let pools = load_all(dir.path()).await.unwrap();
        let emoji = &pools[&Theme::Emoji];
        assert_eq!(emoji.len(), 2);
        assert!(emoji.iter().all(|challenge| challenge.theme == Theme::Emoji));
        assert_eq!(
            emoji[0].metadata.as_ref().unwrap().get("hint").map(String::as_str),
            Some("Disney")
        );
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lyrics.json"), "{not json").unwrap();
        let err = load_all(dir.path()).await.unwrap_err();
        assert!(matches!(err, ContentError::Parse { .. }));
    }
}
