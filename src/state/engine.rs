//! Tournament state engine.
//!
//! Every mutating operation runs against a working copy of the snapshot and is
//! committed only when it succeeds, so a rejected operation never leaves a
//! partial change behind. The engine is synchronous; persistence and viewer
//! notification are driven by [`crate::state::AppState`].

use std::{collections::HashSet, sync::Arc};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{
    bracket::{BracketMismatch, BracketTopology, Outcome, SEED_COUNT},
    draw::{self, ContentPools},
    tournament::{
        Challenge, Match, MatchId, MatchScore, MatchStatus, RoundResult, Settings, Team, TeamSide,
        Theme, TournamentState, default_timers,
    },
};

/// Errors raised by engine operations. None of them leaves state modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The referenced match does not exist.
    #[error("match `{0}` not found")]
    MatchNotFound(String),
    /// The referenced team does not exist.
    #[error("team `{0}` not found")]
    TeamNotFound(Uuid),
    /// The match is not in the lifecycle state the operation requires.
    #[error("{0}")]
    InvalidState(String),
    /// The request itself is malformed.
    #[error("{0}")]
    InvalidInput(String),
    /// The theme has no challenge at all.
    #[error("no challenges available for theme `{0}`")]
    ContentExhausted(Theme),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a reset-round request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRollback {
    /// The match after the rollback.
    pub r#match: Match,
    /// Challenge that was withdrawn, `None` when there was nothing to undo.
    pub undone: Option<String>,
}

/// Owner of the in-memory tournament snapshot.
pub struct TournamentEngine {
    state: TournamentState,
    content: Arc<ContentPools>,
    universe: Vec<Theme>,
    topology: BracketTopology,
    rng: StdRng,
}

impl TournamentEngine {
    /// Create an engine with a freshly bootstrapped tournament.
    pub fn bootstrap(
        teams: Vec<Team>,
        settings: Settings,
        content: Arc<ContentPools>,
        rng: StdRng,
    ) -> EngineResult<Self> {
        let topology = BracketTopology::new();
        let state = build_state(&topology, teams, settings)?;
        Ok(Self::assemble(state, content, topology, rng))
    }

    /// Create an engine around a previously persisted snapshot.
    pub fn restore(
        state: TournamentState,
        content: Arc<ContentPools>,
        rng: StdRng,
    ) -> Result<Self, BracketMismatch> {
        let topology = BracketTopology::new();
        topology.verify(&state.bracket)?;
        ensure_known_teams(&state)?;
        Ok(Self::assemble(state, content, topology, rng))
    }

    fn assemble(
        state: TournamentState,
        content: Arc<ContentPools>,
        topology: BracketTopology,
        rng: StdRng,
    ) -> Self {
        let universe = draw::theme_universe(&content);
        Self {
            state,
            content,
            universe,
            topology,
            rng,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    /// Pretty JSON rendering of the snapshot.
    pub fn export_state(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.state)
    }

    /// Bring a restored snapshot up to date: canonical labels and a timer for
    /// every theme. Returns whether anything changed.
    pub fn normalize(&mut self, defaults: &Settings) -> bool {
        let mut changed = false;

        for m in &mut self.state.bracket {
            let label = self.topology.blueprint(m.id).label;
            if m.label != label {
                m.label = label.to_string();
                changed = true;
            }
        }

        let timers = &mut self.state.settings.timers;
        for (theme, seconds) in defaults.timers.iter().chain(default_timers().iter()) {
            if !timers.contains_key(theme) {
                timers.insert(*theme, *seconds);
                changed = true;
            }
        }

        changed
    }

    /// Replace the whole tournament. Without explicit teams the current first
    /// eight leaderboard teams are reseeded with zeroed scores; without
    /// explicit settings the current ones are kept.
    pub fn reset_tournament(
        &mut self,
        teams: Option<Vec<Team>>,
        settings: Option<Settings>,
    ) -> EngineResult<()> {
        let teams = teams.unwrap_or_else(|| {
            self.state
                .leaderboard
                .iter()
                .take(SEED_COUNT)
                .map(|team| Team {
                    score: 0,
                    ..team.clone()
                })
                .collect()
        });
        let settings = settings.unwrap_or_else(|| self.state.settings.clone());

        self.state = build_state(&self.topology, teams, settings)?;
        info!("tournament reset");
        Ok(())
    }

    /// Replace the leaderboard roster, keeping scores of teams whose id
    /// survives and refreshing the team copies held by bracket slots.
    pub fn set_teams(&mut self, teams: Vec<Team>) -> EngineResult<()> {
        self.transact(|draft| draft.replace_roster(teams))
    }

    /// Start a pending match: bind its teams, pick a theme and draw the first
    /// challenge.
    pub fn start_match(&mut self, id: MatchId) -> EngineResult<Match> {
        self.transact(|draft| {
            let idx = draft.index_of(id)?;
            match draft.state.bracket[idx].status {
                MatchStatus::Pending => {}
                MatchStatus::InProgress => {
                    return Err(EngineError::InvalidState(format!(
                        "match `{id}` is already in progress"
                    )));
                }
                MatchStatus::Completed => {
                    return Err(EngineError::InvalidState(format!(
                        "match `{id}` is already completed; reset it before replaying"
                    )));
                }
            }

            draft.resolve_sources(idx)?;
            let theme = draft.next_theme(idx, None)?;
            draft.draw_challenge(idx, theme)?;

            draft.state.bracket[idx].status = MatchStatus::InProgress;
            draft.state.current_match_id = Some(id);
            info!(match_id = %id, %theme, "match started");
            Ok(draft.state.bracket[idx].clone())
        })
    }

    /// Draw a challenge for a running match, optionally replacing its disabled
    /// themes first. Without an explicit theme a random one is chosen, avoiding
    /// the active theme.
    pub fn set_theme(
        &mut self,
        id: MatchId,
        theme: Option<Theme>,
        disabled: Option<Vec<Theme>>,
    ) -> EngineResult<Challenge> {
        self.transact(|draft| {
            let idx = draft.running_match(id)?;
            if let Some(mut disabled) = disabled {
                let mut seen = HashSet::new();
                disabled.retain(|theme| seen.insert(*theme));
                draft.state.bracket[idx].disabled_themes = disabled;
            }

            let theme = match theme {
                Some(theme) => theme,
                None => {
                    let avoid = draft.state.bracket[idx].active_theme;
                    draft.next_theme(idx, avoid)?
                }
            };
            draft.draw_challenge(idx, theme)
        })
    }

    /// Record one team's result for the current challenge.
    pub fn submit_challenge(
        &mut self,
        id: MatchId,
        side: TeamSide,
        result: RoundResult,
    ) -> EngineResult<Match> {
        self.transact(|draft| {
            let idx = draft.running_match(id)?;
            draft.score_round(idx, &[(side, result)])?;
            Ok(draft.state.bracket[idx].clone())
        })
    }

    /// Record both teams' results for the current challenge.
    pub fn submit_round(
        &mut self,
        id: MatchId,
        result_a: RoundResult,
        result_b: RoundResult,
    ) -> EngineResult<Match> {
        self.transact(|draft| {
            let idx = draft.running_match(id)?;
            draft.score_round(idx, &[(TeamSide::A, result_a), (TeamSide::B, result_b)])?;
            Ok(draft.state.bracket[idx].clone())
        })
    }

    /// Replace the current challenge under a fresh theme without scoring.
    pub fn next_challenge(&mut self, id: MatchId) -> EngineResult<Match> {
        self.transact(|draft| {
            let idx = draft.running_match(id)?;
            let avoid = draft.state.bracket[idx].active_theme;
            let theme = draft.next_theme(idx, avoid)?;
            draft.draw_challenge(idx, theme)?;
            Ok(draft.state.bracket[idx].clone())
        })
    }

    /// Moderator correction: set point totals directly and/or shift leaderboard
    /// scores. Winner determination is not re-run.
    pub fn override_score(
        &mut self,
        id: MatchId,
        team_a: Option<u32>,
        team_b: Option<u32>,
        leaderboard_delta: &IndexMap<Uuid, i64>,
    ) -> EngineResult<()> {
        self.transact(|draft| {
            let idx = draft.index_of(id)?;
            let score = &mut draft.state.bracket[idx].score;
            if let Some(points) = team_a {
                score.team_a = points;
            }
            if let Some(points) = team_b {
                score.team_b = points;
            }

            for (team_id, delta) in leaderboard_delta {
                draft.adjust_team_score(*team_id, *delta)?;
            }
            Ok(())
        })
    }

    /// Force a match to completion with an explicitly chosen winner, running
    /// the same bonus and propagation path as automatic scoring.
    pub fn advance_manual(&mut self, id: MatchId, winner_id: Uuid) -> EngineResult<()> {
        self.transact(|draft| {
            let idx = draft.index_of(id)?;
            if draft.state.bracket[idx].status == MatchStatus::Completed {
                return Err(EngineError::InvalidState(format!(
                    "match `{id}` is already completed; reset it before advancing again"
                )));
            }
            draft.team(winner_id)?;
            draft.resolve_sources(idx)?;

            let side = draft.state.bracket[idx].side_of(winner_id).ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "team `{winner_id}` does not play in match `{id}`"
                ))
            })?;
            draft.complete_match(idx, side)
        })
    }

    /// Clear a match back to pending, reversing its win bonus, then clear and
    /// unbind every match downstream of it. Returns the dependents cleared.
    pub fn reset_match(&mut self, id: MatchId) -> EngineResult<Vec<MatchId>> {
        self.transact(|draft| {
            let idx = draft.index_of(id)?;
            draft.clear_match(idx, false)?;

            let dependents = draft.topology.dependents(id);
            for dependent in &dependents {
                let dependent_idx = draft.index_of(*dependent)?;
                draft.clear_match(dependent_idx, true)?;
            }

            info!(match_id = %id, cleared = ?dependents, "match reset");
            Ok(dependents)
        })
    }

    /// Withdraw the current challenge so another can be drawn. A match without
    /// a current challenge is left untouched.
    pub fn reset_round(&mut self, id: MatchId) -> EngineResult<RoundRollback> {
        self.transact(|draft| {
            let idx = draft.index_of(id)?;
            let m = &mut draft.state.bracket[idx];
            if m.current_challenge.is_none() {
                return Ok(RoundRollback {
                    r#match: m.clone(),
                    undone: None,
                });
            }

            m.current_challenge = None;
            let undone = m.used_challenge_ids.pop();
            let snapshot = m.clone();

            if let Some(challenge_id) = &undone {
                let registry = &mut draft.state.global_used_challenge_ids;
                if let Some(position) = registry.iter().rposition(|used| used == challenge_id) {
                    registry.remove(position);
                }
            }

            debug!(match_id = %id, challenge = ?undone, "round rolled back");
            Ok(RoundRollback {
                r#match: snapshot,
                undone,
            })
        })
    }

    fn transact<T>(
        &mut self,
        operation: impl FnOnce(&mut Draft<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut working = self.state.clone();
        let value = {
            let mut draft = Draft {
                state: &mut working,
                content: self.content.as_ref(),
                universe: self.universe.as_slice(),
                topology: &self.topology,
                rng: &mut self.rng,
            };
            operation(&mut draft)?
        };
        self.state = working;
        Ok(value)
    }
}

/// Lay out a brand-new tournament from at least eight teams.
fn build_state(
    topology: &BracketTopology,
    teams: Vec<Team>,
    settings: Settings,
) -> EngineResult<TournamentState> {
    if teams.len() < SEED_COUNT {
        return Err(EngineError::InvalidInput(format!(
            "need at least {SEED_COUNT} teams to seed the bracket, got {}",
            teams.len()
        )));
    }
    if settings.best_of == 0 {
        return Err(EngineError::InvalidInput(
            "best-of must be at least one round".into(),
        ));
    }

    let seeded: Vec<Team> = teams.into_iter().take(SEED_COUNT).collect();
    ensure_valid_roster(&seeded)?;

    let bracket = topology.build_bracket(&seeded, settings.best_of);
    Ok(TournamentState {
        bracket,
        leaderboard: seeded,
        settings,
        current_match_id: None,
        global_used_challenge_ids: Vec::new(),
    })
}

/// Every team a match refers to must be on the leaderboard.
fn ensure_known_teams(state: &TournamentState) -> Result<(), BracketMismatch> {
    let known: HashSet<Uuid> = state.leaderboard.iter().map(|team| team.id).collect();
    for m in &state.bracket {
        if let Some(team) = m.referenced_team_ids().find(|id| !known.contains(id)) {
            return Err(BracketMismatch::UnknownTeam {
                match_id: m.id,
                team,
            });
        }
    }
    Ok(())
}

fn ensure_valid_roster(teams: &[Team]) -> EngineResult<()> {
    let mut ids = HashSet::new();
    for team in teams {
        if team.name.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "team name must not be empty".into(),
            ));
        }
        if !ids.insert(team.id) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate team id `{}`",
                team.id
            )));
        }
    }
    Ok(())
}

/// Mutable view over the working copy of an in-flight operation.
struct Draft<'a> {
    state: &'a mut TournamentState,
    content: &'a ContentPools,
    universe: &'a [Theme],
    topology: &'a BracketTopology,
    rng: &'a mut StdRng,
}

impl Draft<'_> {
    fn index_of(&self, id: MatchId) -> EngineResult<usize> {
        self.state
            .bracket
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| EngineError::MatchNotFound(id.to_string()))
    }

    fn running_match(&self, id: MatchId) -> EngineResult<usize> {
        let idx = self.index_of(id)?;
        let status = self.state.bracket[idx].status;
        if status != MatchStatus::InProgress {
            return Err(EngineError::InvalidState(format!(
                "match `{id}` is not in progress (status {status:?})"
            )));
        }
        Ok(idx)
    }

    fn team(&self, id: Uuid) -> EngineResult<&Team> {
        self.state
            .find_team(id)
            .ok_or(EngineError::TeamNotFound(id))
    }

    fn replace_roster(&mut self, teams: Vec<Team>) -> EngineResult<()> {
        if teams.len() < SEED_COUNT {
            return Err(EngineError::InvalidInput(format!(
                "need at least {SEED_COUNT} teams, got {}",
                teams.len()
            )));
        }
        ensure_valid_roster(&teams)?;

        let previous: IndexMap<Uuid, u32> = self
            .state
            .leaderboard
            .iter()
            .map(|team| (team.id, team.score))
            .collect();
        let roster: Vec<Team> = teams
            .into_iter()
            .map(|team| Team {
                score: previous.get(&team.id).copied().unwrap_or(0),
                ..team
            })
            .collect();

        for m in &self.state.bracket {
            if let Some(missing) = m
                .referenced_team_ids()
                .find(|id| !roster.iter().any(|team| team.id == *id))
            {
                return Err(EngineError::InvalidInput(format!(
                    "team `{missing}` is still referenced by match `{}`",
                    m.id
                )));
            }
        }

        for m in &mut self.state.bracket {
            for side in TeamSide::BOTH {
                let Some(bound) = m.slot(side).map(|team| team.id) else {
                    continue;
                };
                if let Some(fresh) = roster.iter().find(|team| team.id == bound) {
                    *m.slot_mut(side) = Some(fresh.clone());
                }
            }
        }

        self.state.leaderboard = roster;
        Ok(())
    }

    /// Fill unbound slots from the outcome of their source matches.
    fn resolve_sources(&mut self, idx: usize) -> EngineResult<()> {
        let id = self.state.bracket[idx].id;
        let topology = self.topology;

        for side in TeamSide::BOTH {
            if self.state.bracket[idx].slot(side).is_some() {
                continue;
            }
            let Some(feed) = topology.feed(id, side) else {
                return Err(EngineError::InvalidState(format!(
                    "match `{id}` has no team in slot {side}"
                )));
            };

            let source_idx = self.index_of(feed.source)?;
            let source = &self.state.bracket[source_idx];
            let team_id = match feed.outcome {
                Outcome::Winner => source.winner_id,
                Outcome::Loser => source.loser_id,
            };
            let Some(team_id) = team_id else {
                return Err(EngineError::InvalidState(format!(
                    "match `{id}` is not ready: waiting for `{}` to finish",
                    feed.source
                )));
            };

            let team = self.team(team_id)?.clone();
            *self.state.bracket[idx].slot_mut(side) = Some(team);
        }

        Ok(())
    }

    fn next_theme(&mut self, idx: usize, avoid: Option<Theme>) -> EngineResult<Theme> {
        let disabled = &self.state.bracket[idx].disabled_themes;
        draw::pick_theme(&mut *self.rng, self.universe, disabled, avoid)
            .ok_or_else(|| EngineError::InvalidState("no themes are configured".into()))
    }

    fn draw_challenge(&mut self, idx: usize, theme: Theme) -> EngineResult<Challenge> {
        let content = self.content;
        let pool = content.get(&theme).map(Vec::as_slice).unwrap_or_default();
        let challenge = draw::pick_challenge(
            &mut *self.rng,
            pool,
            &self.state.global_used_challenge_ids,
        )
        .cloned()
        .ok_or(EngineError::ContentExhausted(theme))?;

        self.state
            .global_used_challenge_ids
            .push(challenge.id.clone());
        let m = &mut self.state.bracket[idx];
        m.used_challenge_ids.push(challenge.id.clone());
        m.current_challenge = Some(challenge.clone());
        m.active_theme = Some(theme);

        debug!(match_id = %m.id, %theme, challenge = %challenge.id, "challenge drawn");
        Ok(challenge)
    }

    /// Shared scoring path for single-side and paired submissions.
    fn score_round(&mut self, idx: usize, results: &[(TeamSide, RoundResult)]) -> EngineResult<()> {
        let per_correct = self.state.settings.scoring.per_correct;
        let m = &mut self.state.bracket[idx];
        m.score.rounds_played = m.score.rounds_played.saturating_add(1);
        for (side, result) in results {
            if result.is_correct() {
                let points = m.score.points_mut(*side);
                *points = points.saturating_add(per_correct);
            }
        }

        let decision = decide_winner(&m.score);
        let just_played = m.active_theme;
        match decision {
            Some(side) => self.complete_match(idx, side),
            None => {
                let theme = self.next_theme(idx, just_played)?;
                self.draw_challenge(idx, theme)?;
                Ok(())
            }
        }
    }

    fn complete_match(&mut self, idx: usize, winner_side: TeamSide) -> EngineResult<()> {
        let win_bonus = self.state.settings.scoring.win_bonus;
        let m = &mut self.state.bracket[idx];
        let id = m.id;
        let (Some(winner), Some(loser)) = (m.slot(winner_side), m.slot(winner_side.other())) else {
            return Err(EngineError::InvalidState(format!(
                "match `{id}` needs two teams before a winner can be recorded"
            )));
        };
        let (winner, loser) = (winner.id, loser.id);

        m.status = MatchStatus::Completed;
        m.winner_id = Some(winner);
        m.loser_id = Some(loser);
        m.current_challenge = None;
        if self.state.current_match_id == Some(id) {
            self.state.current_match_id = None;
        }

        self.adjust_team_score(winner, i64::from(win_bonus))?;
        self.propagate(idx)?;
        info!(match_id = %id, %winner, %loser, "match completed");
        Ok(())
    }

    /// Push the outcome of a completed match into the slots it feeds.
    fn propagate(&mut self, idx: usize) -> EngineResult<()> {
        let m = &self.state.bracket[idx];
        let (Some(winner), Some(loser)) = (m.winner_id, m.loser_id) else {
            return Ok(());
        };
        let topology = self.topology;

        for edge in topology.downstream(m.id) {
            let team_id = match edge.outcome {
                Outcome::Winner => winner,
                Outcome::Loser => loser,
            };
            let team = self.team(team_id)?.clone();
            let target = self.index_of(edge.target)?;
            *self.state.bracket[target].slot_mut(edge.side) = Some(team);
        }
        Ok(())
    }

    /// Apply a signed delta to a leaderboard score, clamped at zero, and mirror
    /// it into every bracket slot holding that team.
    fn adjust_team_score(&mut self, team_id: Uuid, delta: i64) -> EngineResult<u32> {
        let team = self
            .state
            .leaderboard
            .iter_mut()
            .find(|team| team.id == team_id)
            .ok_or(EngineError::TeamNotFound(team_id))?;
        let next = (i64::from(team.score) + delta).clamp(0, i64::from(u32::MAX));
        team.score = u32::try_from(next).unwrap_or(u32::MAX);
        let score = team.score;

        for m in &mut self.state.bracket {
            for side in TeamSide::BOTH {
                if let Some(bound) = m.slot_mut(side).as_mut() {
                    if bound.id == team_id {
                        bound.score = score;
                    }
                }
            }
        }
        Ok(score)
    }

    /// Return a match to pending. `unbind` also empties its team slots.
    fn clear_match(&mut self, idx: usize, unbind: bool) -> EngineResult<()> {
        let win_bonus = self.state.settings.scoring.win_bonus;
        let m = &mut self.state.bracket[idx];
        let id = m.id;
        let rewarded = m.winner_id.take();

        m.loser_id = None;
        m.status = MatchStatus::Pending;
        m.current_challenge = None;
        m.active_theme = None;
        m.used_challenge_ids.clear();
        m.score = MatchScore::new(m.score.best_of);
        if unbind {
            m.team_a = None;
            m.team_b = None;
        }

        if self.state.current_match_id == Some(id) {
            self.state.current_match_id = None;
        }
        if let Some(winner) = rewarded {
            self.adjust_team_score(winner, -i64::from(win_bonus))?;
        }
        Ok(())
    }
}

/// Winner once the scheduled rounds are played; ties keep going.
fn decide_winner(score: &MatchScore) -> Option<TeamSide> {
    if score.rounds_played < score.best_of {
        return None;
    }
    match score.team_a.cmp(&score.team_b) {
        std::cmp::Ordering::Greater => Some(TeamSide::A),
        std::cmp::Ordering::Less => Some(TeamSide::B),
        std::cmp::Ordering::Equal => None,
    }
}
