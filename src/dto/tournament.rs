//! Request and response bodies of the moderator API.

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_display_name},
    state::tournament::{ScoringRule, Settings, Team, Theme},
};

/// Incoming team definition. Teams without an id get a fresh one.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TeamInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub players: Vec<String>,
}

impl TeamInput {
    /// Build the team with a zero score; the engine restores known scores.
    pub fn to_team(&self) -> Team {
        Team {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name.trim().to_string(),
            players: self
                .players
                .iter()
                .map(|player| player.trim().to_string())
                .filter(|player| !player.is_empty())
                .collect(),
            score: 0,
        }
    }
}

impl Validate for TeamInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        for player in &self.players {
            if let Err(e) = validate_display_name(player) {
                errors.add("players", e);
                break;
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial settings; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub timers: Option<IndexMap<Theme, u32>>,
    #[serde(default)]
    #[validate(nested)]
    pub scoring: Option<ScoringRule>,
    #[serde(default)]
    #[validate(range(min = 1, max = 99))]
    pub best_of: Option<u32>,
}

impl SettingsInput {
    /// Overlay these fields on `base`.
    pub fn apply_to(&self, base: &Settings) -> Settings {
        let mut settings = base.clone();
        if let Some(timers) = &self.timers {
            settings
                .timers
                .extend(timers.iter().map(|(theme, seconds)| (*theme, *seconds)));
        }
        if let Some(scoring) = &self.scoring {
            settings.scoring = scoring.clone();
        }
        if let Some(best_of) = self.best_of {
            settings.best_of = best_of;
        }
        settings
    }
}

/// Payload of a full tournament reset.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ResetRequest {
    #[serde(default)]
    #[validate(nested)]
    pub teams: Option<Vec<TeamInput>>,
    #[serde(default)]
    #[validate(nested)]
    pub settings: Option<SettingsInput>,
}

/// Any request that only names a match.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub match_id: String,
}

/// Draw a challenge, optionally from an explicit theme.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRequest {
    pub match_id: String,
    #[serde(default)]
    pub theme: Option<Theme>,
    /// Replaces the disabled list when present; an empty list clears it.
    #[serde(default)]
    pub disabled: Option<Vec<Theme>>,
}

/// One team's result for the current challenge.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChallengeRequest {
    pub match_id: String,
    /// `A` or `B`.
    pub team: String,
    /// `correct`, `wrong` or `timeout`.
    pub result: String,
}

/// Both teams' results for the current challenge.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRoundRequest {
    pub match_id: String,
    pub team_a: String,
    pub team_b: String,
}

/// Moderator score correction.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OverrideScoreRequest {
    pub match_id: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000))]
    pub team_a_score: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000))]
    pub team_b_score: Option<i64>,
    /// Signed adjustments keyed by team id.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub leaderboard_delta: Option<IndexMap<Uuid, i64>>,
}

/// Force a winner for a match.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub match_id: String,
    pub winner_id: Uuid,
}

/// Sound cue to play on every viewer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SfxRequest {
    #[validate(length(min = 1, max = 64))]
    pub event: String,
}

/// Acknowledgement of a fire-and-forget request.
#[derive(Debug, Serialize, ToSchema)]
pub struct SfxResponse {
    pub ok: bool,
}

/// Pretty JSON rendering of the current snapshot.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub state: String,
    /// RFC 3339 timestamp of the export.
    pub exported_at: String,
}

impl ExportResponse {
    /// Wrap an exported snapshot, stamping it with `at`.
    pub fn new(state: String, at: SystemTime) -> Self {
        Self {
            state,
            exported_at: format_system_time(at),
        }
    }
}
