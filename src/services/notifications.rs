use serde::Serialize;
use tracing::warn;

use crate::{
    dto::events::{
        ChallengeEvent, MatchAdvanceEvent, MatchStartEvent, ScoreUpdateEvent, ServerEvent,
        SfxEvent, StateUpdateEvent,
    },
    state::tournament::{Challenge, Match, MatchId, MatchStatus, TournamentState},
};

pub const EVENT_STATE_UPDATE: &str = "state:update";
pub const EVENT_MATCH_START: &str = "match:start";
pub const EVENT_CHALLENGE_NEW: &str = "challenge:new";
pub const EVENT_SCORE_UPDATE: &str = "score:update";
pub const EVENT_MATCH_ADVANCE: &str = "match:advance";
pub const EVENT_SFX: &str = "sfx";

/// Full snapshot, sent after every change and to every new viewer.
pub fn state_update(state: &TournamentState) -> Option<ServerEvent> {
    build(EVENT_STATE_UPDATE, &StateUpdateEvent { data: state })
}

/// A match started, or was reset back to its opening view.
pub fn match_start(match_id: MatchId, challenge: Option<Challenge>) -> Option<ServerEvent> {
    build(
        EVENT_MATCH_START,
        &MatchStartEvent {
            match_id,
            challenge,
        },
    )
}

/// A match shows a new challenge, or none after a rollback.
pub fn challenge_new(match_id: MatchId, challenge: Option<Challenge>) -> Option<ServerEvent> {
    build(
        EVENT_CHALLENGE_NEW,
        &ChallengeEvent {
            match_id,
            challenge,
        },
    )
}

/// Round scored on `m`.
pub fn score_update(m: &Match) -> Option<ServerEvent> {
    build(
        EVENT_SCORE_UPDATE,
        &ScoreUpdateEvent {
            match_id: m.id,
            score: m.score.clone(),
            challenge: m.current_challenge.clone(),
        },
    )
}

/// `m` has been decided; `None` while it is still running.
pub fn match_advance(m: &Match) -> Option<ServerEvent> {
    if m.status != MatchStatus::Completed {
        return None;
    }
    build(
        EVENT_MATCH_ADVANCE,
        &MatchAdvanceEvent {
            match_id: m.id,
            winner_id: m.winner_id,
            loser_id: m.loser_id,
        },
    )
}

/// Moderator sound cue.
pub fn sfx(event: &str) -> Option<ServerEvent> {
    build(
        EVENT_SFX,
        &SfxEvent {
            event: event.to_string(),
        },
    )
}

fn build(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(event, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize viewer event payload");
            None
        }
    }
}
