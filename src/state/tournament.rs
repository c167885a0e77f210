//! Tournament data model: teams, challenges, matches and the full snapshot that
//! gets persisted and broadcast to viewers.
//!
//! Field names serialize in camelCase because the viewer frontends consume the
//! snapshot verbatim.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Number of rounds a match plays before a winner can be declared.
pub const DEFAULT_BEST_OF: u32 = 5;

/// Upper bound for points per answer and for the win bonus.
pub const MAX_AWARD: u32 = 100;

/// Challenge category, each with its own content pool and timer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Finish the lyric.
    Lyrics,
    /// Guess the movie scene.
    Scene,
    /// Decode the emoji string.
    Emoji,
    /// General trivia question.
    Trivia,
}

impl Theme {
    /// Every theme known to the show, in display order.
    pub const ALL: [Theme; 4] = [Theme::Lyrics, Theme::Scene, Theme::Emoji, Theme::Trivia];

    /// Wire name of the theme.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Lyrics => "lyrics",
            Theme::Scene => "scene",
            Theme::Emoji => "emoji",
            Theme::Trivia => "trivia",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a bracket match. The bracket topology is fixed, so the set of
/// identifiers is closed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum MatchId {
    /// Group stage match 1.
    #[serde(rename = "qf1", alias = "g1")]
    Qf1,
    /// Group stage match 2.
    #[serde(rename = "qf2", alias = "g2")]
    Qf2,
    /// Group stage match 3.
    #[serde(rename = "qf3", alias = "g3")]
    Qf3,
    /// Group stage match 4.
    #[serde(rename = "qf4", alias = "g4")]
    Qf4,
    /// First semifinal.
    #[serde(rename = "sf1")]
    Sf1,
    /// Second semifinal.
    #[serde(rename = "sf2")]
    Sf2,
    /// Grand final.
    #[serde(rename = "final")]
    Final,
    /// Third place playoff between the semifinal losers.
    #[serde(rename = "third")]
    Third,
}

impl MatchId {
    /// Bracket order used when the tournament is bootstrapped.
    pub const ALL: [MatchId; 8] = [
        MatchId::Qf1,
        MatchId::Qf2,
        MatchId::Qf3,
        MatchId::Qf4,
        MatchId::Sf1,
        MatchId::Sf2,
        MatchId::Final,
        MatchId::Third,
    ];

    /// Wire name of the match.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchId::Qf1 => "qf1",
            MatchId::Qf2 => "qf2",
            MatchId::Qf3 => "qf3",
            MatchId::Qf4 => "qf4",
            MatchId::Sf1 => "sf1",
            MatchId::Sf2 => "sf2",
            MatchId::Final => "final",
            MatchId::Third => "third",
        }
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a string does not name a bracket match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown match id `{0}`")]
pub struct UnknownMatchId(pub String);

impl FromStr for MatchId {
    type Err = UnknownMatchId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "qf1" | "g1" => Ok(MatchId::Qf1),
            "qf2" | "g2" => Ok(MatchId::Qf2),
            "qf3" | "g3" => Ok(MatchId::Qf3),
            "qf4" | "g4" => Ok(MatchId::Qf4),
            "sf1" => Ok(MatchId::Sf1),
            "sf2" => Ok(MatchId::Sf2),
            "final" => Ok(MatchId::Final),
            "third" => Ok(MatchId::Third),
            other => Err(UnknownMatchId(other.to_string())),
        }
    }
}

/// One of the two team slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TeamSide {
    /// Left slot.
    A,
    /// Right slot.
    B,
}

impl TeamSide {
    /// Both sides, A first.
    pub const BOTH: [TeamSide; 2] = [TeamSide::A, TeamSide::B];

    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            TeamSide::A => TeamSide::B,
            TeamSide::B => TeamSide::A,
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSide::A => f.write_str("A"),
            TeamSide::B => f.write_str("B"),
        }
    }
}

/// Raised when a team side designator is neither `A` nor `B`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("team side must be 'A' or 'B', got `{0}`")]
pub struct InvalidTeamSide(pub String);

impl FromStr for TeamSide {
    type Err = InvalidTeamSide;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "A" | "a" => Ok(TeamSide::A),
            "B" | "b" => Ok(TeamSide::B),
            other => Err(InvalidTeamSide(other.to_string())),
        }
    }
}

/// Outcome of one team's attempt at a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    /// Answered correctly; earns the per-correct points.
    Correct,
    /// Answered wrong.
    Wrong,
    /// Ran out of time.
    Timeout,
}

impl RoundResult {
    /// Whether this result earns points.
    pub fn is_correct(self) -> bool {
        matches!(self, RoundResult::Correct)
    }
}

/// Raised when a round result is not one of `correct`, `wrong`, `timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("result must be one of 'correct', 'wrong' or 'timeout', got `{0}`")]
pub struct InvalidRoundResult(pub String);

impl FromStr for RoundResult {
    type Err = InvalidRoundResult;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "correct" => Ok(RoundResult::Correct),
            "wrong" => Ok(RoundResult::Wrong),
            "timeout" => Ok(RoundResult::Timeout),
            _ => Err(InvalidRoundResult(value.to_string())),
        }
    }
}

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Rounds are being played.
    InProgress,
    /// A winner has been recorded.
    Completed,
}

/// A pair of contestants competing together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Team {
    /// Stable identifier, never changes after creation.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Member names in display order.
    #[serde(default)]
    pub players: Vec<String>,
    /// Cumulative leaderboard score.
    #[serde(default)]
    pub score: u32,
}

impl Team {
    /// Create a team with a fresh identifier and a zero score.
    pub fn new(name: impl Into<String>, players: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            players,
            score: 0,
        }
    }
}

/// A single prompt drawn from a theme pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Challenge {
    /// Identifier, unique across all pools.
    pub id: String,
    /// Pool the challenge belongs to.
    pub theme: Theme,
    /// What is shown to the teams.
    pub prompt: String,
    /// Expected answer, shown to the moderator.
    pub answer: String,
    /// Free-form extras (hints, media references).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<IndexMap<String, String>>,
}

fn default_best_of() -> u32 {
    DEFAULT_BEST_OF
}

/// Running score of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    /// Points of the team in slot A.
    #[serde(default)]
    pub team_a: u32,
    /// Points of the team in slot B.
    #[serde(default)]
    pub team_b: u32,
    /// Minimum number of rounds before a winner can be declared.
    #[serde(default = "default_best_of")]
    pub best_of: u32,
    /// Rounds played so far.
    #[serde(default, rename = "currentChallenge", alias = "roundsPlayed")]
    pub rounds_played: u32,
}

impl MatchScore {
    /// Fresh score sheet for a match of `best_of` rounds.
    pub fn new(best_of: u32) -> Self {
        Self {
            team_a: 0,
            team_b: 0,
            best_of,
            rounds_played: 0,
        }
    }

    /// Points earned by `side`.
    pub fn points(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::A => self.team_a,
            TeamSide::B => self.team_b,
        }
    }

    /// Mutable access to the points of `side`.
    pub fn points_mut(&mut self, side: TeamSide) -> &mut u32 {
        match side {
            TeamSide::A => &mut self.team_a,
            TeamSide::B => &mut self.team_b,
        }
    }
}

impl Default for MatchScore {
    fn default() -> Self {
        Self::new(DEFAULT_BEST_OF)
    }
}

/// A bracket match and everything that happened in it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Position in the bracket.
    pub id: MatchId,
    /// Display label.
    pub label: String,
    /// Copy of the team bound to slot A.
    pub team_a: Option<Team>,
    /// Copy of the team bound to slot B.
    pub team_b: Option<Team>,
    /// Upstream match feeding slot A.
    #[serde(default)]
    pub source_a: Option<MatchId>,
    /// Upstream match feeding slot B.
    #[serde(default)]
    pub source_b: Option<MatchId>,
    /// Set once the match is completed.
    #[serde(default)]
    pub winner_id: Option<Uuid>,
    /// Set once the match is completed.
    #[serde(default)]
    pub loser_id: Option<Uuid>,
    /// Running score.
    #[serde(default)]
    pub score: MatchScore,
    /// Lifecycle status.
    #[serde(default)]
    pub status: MatchStatus,
    /// Challenge currently on screen.
    #[serde(default)]
    pub current_challenge: Option<Challenge>,
    /// Theme of the current challenge.
    #[serde(default)]
    pub active_theme: Option<Theme>,
    /// Challenges drawn during this match, oldest first.
    #[serde(default)]
    pub used_challenge_ids: Vec<String>,
    /// Themes the moderator switched off for this match.
    #[serde(default)]
    pub disabled_themes: Vec<Theme>,
}

impl Match {
    /// Team bound to `side`, if any.
    pub fn slot(&self, side: TeamSide) -> Option<&Team> {
        match side {
            TeamSide::A => self.team_a.as_ref(),
            TeamSide::B => self.team_b.as_ref(),
        }
    }

    /// Mutable slot binding for `side`.
    pub fn slot_mut(&mut self, side: TeamSide) -> &mut Option<Team> {
        match side {
            TeamSide::A => &mut self.team_a,
            TeamSide::B => &mut self.team_b,
        }
    }

    /// Upstream match feeding `side`.
    pub fn source(&self, side: TeamSide) -> Option<MatchId> {
        match side {
            TeamSide::A => self.source_a,
            TeamSide::B => self.source_b,
        }
    }

    /// Side on which `team_id` plays in this match.
    pub fn side_of(&self, team_id: Uuid) -> Option<TeamSide> {
        TeamSide::BOTH
            .into_iter()
            .find(|side| self.slot(*side).is_some_and(|team| team.id == team_id))
    }

    /// Every team id this match refers to (slots, winner, loser).
    pub fn referenced_team_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.team_a
            .iter()
            .chain(self.team_b.iter())
            .map(|team| team.id)
            .chain(self.winner_id)
            .chain(self.loser_id)
    }
}

/// Points awarded during play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRule {
    /// Points for each correct answer.
    #[validate(range(max = MAX_AWARD))]
    pub per_correct: u32,
    /// Leaderboard bonus for winning a match.
    #[validate(range(max = MAX_AWARD))]
    pub win_bonus: u32,
}

impl Default for ScoringRule {
    fn default() -> Self {
        Self {
            per_correct: 1,
            win_bonus: 2,
        }
    }
}

/// Default answer timer per theme, in seconds.
pub fn default_timers() -> IndexMap<Theme, u32> {
    IndexMap::from([
        (Theme::Lyrics, 10),
        (Theme::Scene, 15),
        (Theme::Emoji, 25),
        (Theme::Trivia, 15),
    ])
}

/// Tournament-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Answer timer per theme, in seconds.
    #[schema(value_type = Object)]
    pub timers: IndexMap<Theme, u32>,
    /// Points awarded during play.
    pub scoring: ScoringRule,
    /// Rounds per match before a winner can be declared.
    #[serde(default = "default_best_of")]
    pub best_of: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timers: default_timers(),
            scoring: ScoringRule::default(),
            best_of: DEFAULT_BEST_OF,
        }
    }
}

/// Complete tournament snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    /// The eight bracket matches in topology order.
    pub bracket: Vec<Match>,
    /// Every registered team with its cumulative score.
    pub leaderboard: Vec<Team>,
    /// Timers and scoring.
    pub settings: Settings,
    /// Match most recently started and not yet finished.
    #[serde(default)]
    pub current_match_id: Option<MatchId>,
    /// Every challenge drawn during the tournament, oldest first.
    #[serde(default)]
    pub global_used_challenge_ids: Vec<String>,
}

impl TournamentState {
    /// Look up a match by id.
    pub fn find_match(&self, id: MatchId) -> Option<&Match> {
        self.bracket.iter().find(|m| m.id == id)
    }

    /// Look up a leaderboard team by id.
    pub fn find_team(&self, id: Uuid) -> Option<&Team> {
        self.leaderboard.iter().find(|team| team.id == id)
    }
}
