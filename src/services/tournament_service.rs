//! Moderator operations: parse and validate requests, run them through the
//! engine, and announce the outcome to viewers.

use std::time::SystemTime;

use tracing::info;
use validator::Validate;

use crate::{
    dto::tournament::{
        AdvanceRequest, ExportResponse, MatchRequest, OverrideScoreRequest, ResetRequest,
        SfxRequest, SfxResponse, SubmitChallengeRequest, SubmitRoundRequest, TeamInput,
        ThemeRequest,
    },
    error::ServiceError,
    services::notifications,
    state::{
        Announcement, SharedState,
        tournament::{
            Challenge, InvalidRoundResult, InvalidTeamSide, Match, MatchId, RoundResult, TeamSide,
            TournamentState, UnknownMatchId,
        },
    },
};

/// Current snapshot.
pub async fn get_state(state: &SharedState) -> TournamentState {
    state.snapshot().await
}

/// Rebuild the whole tournament.
pub async fn reset_tournament(
    state: &SharedState,
    payload: ResetRequest,
) -> Result<TournamentState, ServiceError> {
    payload.validate()?;
    let teams = payload
        .teams
        .map(|teams| teams.iter().map(TeamInput::to_team).collect());

    let snapshot = state
        .run_mutation(
            |engine| {
                let settings = payload
                    .settings
                    .map(|input| input.apply_to(&engine.state().settings));
                engine.reset_tournament(teams, settings)?;
                Ok(engine.state().clone())
            },
            |_, _| Announcement::Changed(Vec::new()),
        )
        .await?;

    info!("tournament reset by moderator");
    Ok(snapshot)
}

/// Replace the roster.
pub async fn set_teams(
    state: &SharedState,
    payload: Vec<TeamInput>,
) -> Result<TournamentState, ServiceError> {
    for team in &payload {
        team.validate()?;
    }
    let teams = payload.iter().map(TeamInput::to_team).collect();

    state
        .run_mutation(
            |engine| {
                engine.set_teams(teams)?;
                Ok(engine.state().clone())
            },
            |_, _| Announcement::Changed(Vec::new()),
        )
        .await
}

/// Start a pending match.
pub async fn start_match(
    state: &SharedState,
    payload: MatchRequest,
) -> Result<Match, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    state
        .run_mutation(
            |engine| engine.start_match(id),
            |started, _| {
                Announcement::changed([notifications::match_start(
                    started.id,
                    started.current_challenge.clone(),
                )])
            },
        )
        .await
}

/// Draw a challenge for a running match, optionally from an explicit theme.
pub async fn set_theme(
    state: &SharedState,
    payload: ThemeRequest,
) -> Result<Challenge, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    state
        .run_mutation(
            |engine| engine.set_theme(id, payload.theme, payload.disabled),
            |challenge, _| {
                Announcement::changed([notifications::challenge_new(id, Some(challenge.clone()))])
            },
        )
        .await
}

/// Score one team's attempt.
pub async fn submit_challenge(
    state: &SharedState,
    payload: SubmitChallengeRequest,
) -> Result<Match, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    let side = parse_side(&payload.team)?;
    let result = parse_result(&payload.result)?;

    state
        .run_mutation(
            |engine| engine.submit_challenge(id, side, result),
            |m, _| announce_round(m),
        )
        .await
}

/// Score both teams' attempts.
pub async fn submit_round(
    state: &SharedState,
    payload: SubmitRoundRequest,
) -> Result<Match, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    let result_a = parse_result(&payload.team_a)?;
    let result_b = parse_result(&payload.team_b)?;

    state
        .run_mutation(
            |engine| engine.submit_round(id, result_a, result_b),
            |m, _| announce_round(m),
        )
        .await
}

/// Swap the current challenge without scoring.
pub async fn next_challenge(
    state: &SharedState,
    payload: MatchRequest,
) -> Result<Match, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    state
        .run_mutation(
            |engine| engine.next_challenge(id),
            |m, _| {
                Announcement::changed([notifications::challenge_new(
                    m.id,
                    m.current_challenge.clone(),
                )])
            },
        )
        .await
}

/// Moderator score correction.
pub async fn override_score(
    state: &SharedState,
    payload: OverrideScoreRequest,
) -> Result<TournamentState, ServiceError> {
    payload.validate()?;
    let id = parse_match_id(&payload.match_id)?;
    let team_a = payload.team_a_score.map(to_points).transpose()?;
    let team_b = payload.team_b_score.map(to_points).transpose()?;
    let delta = payload.leaderboard_delta.unwrap_or_default();

    state
        .run_mutation(
            |engine| {
                engine.override_score(id, team_a, team_b, &delta)?;
                Ok(engine.state().clone())
            },
            |_, _| Announcement::Changed(Vec::new()),
        )
        .await
}

/// Force a winner.
pub async fn advance(
    state: &SharedState,
    payload: AdvanceRequest,
) -> Result<TournamentState, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    let snapshot = state
        .run_mutation(
            |engine| {
                engine.advance_manual(id, payload.winner_id)?;
                Ok(engine.state().clone())
            },
            |_, snapshot| {
                let completed = snapshot.find_match(id);
                Announcement::changed([completed.and_then(notifications::match_advance)])
            },
        )
        .await?;

    info!(match_id = %id, winner = %payload.winner_id, "match advanced manually");
    Ok(snapshot)
}

/// Clear a match and everything downstream of it.
pub async fn reset_match(
    state: &SharedState,
    payload: MatchRequest,
) -> Result<TournamentState, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    state
        .run_mutation(
            |engine| {
                engine.reset_match(id)?;
                Ok(engine.state().clone())
            },
            |_, _| Announcement::changed([notifications::match_start(id, None)]),
        )
        .await
}

/// Withdraw the current challenge of a match.
pub async fn reset_round(
    state: &SharedState,
    payload: MatchRequest,
) -> Result<Match, ServiceError> {
    let id = parse_match_id(&payload.match_id)?;
    let rollback = state
        .run_mutation(
            |engine| engine.reset_round(id),
            |rollback, _| match rollback.undone {
                Some(_) => Announcement::changed([notifications::challenge_new(id, None)]),
                None => Announcement::Unchanged,
            },
        )
        .await?;
    Ok(rollback.r#match)
}

/// Pretty JSON of the current snapshot.
pub async fn export_state(state: &SharedState) -> Result<ExportResponse, ServiceError> {
    let exported = state
        .read_engine(|engine| engine.export_state())
        .await
        .map_err(|err| ServiceError::Internal(format!("failed to export state: {err}")))?;
    Ok(ExportResponse::new(exported, SystemTime::now()))
}

/// Relay a sound cue to every viewer. Nothing is stored.
pub async fn sfx(state: &SharedState, payload: SfxRequest) -> Result<SfxResponse, ServiceError> {
    payload.validate()?;
    if let Some(event) = notifications::sfx(payload.event.trim()) {
        state.broadcast(event);
    }
    Ok(SfxResponse { ok: true })
}

fn announce_round(m: &Match) -> Announcement {
    Announcement::changed([notifications::score_update(m), notifications::match_advance(m)])
}

fn parse_match_id(raw: &str) -> Result<MatchId, ServiceError> {
    raw.parse()
        .map_err(|err: UnknownMatchId| ServiceError::NotFound(err.to_string()))
}

fn parse_side(raw: &str) -> Result<TeamSide, ServiceError> {
    raw.parse()
        .map_err(|err: InvalidTeamSide| ServiceError::InvalidInput(err.to_string()))
}

fn parse_result(raw: &str) -> Result<RoundResult, ServiceError> {
    raw.parse()
        .map_err(|err: InvalidRoundResult| ServiceError::InvalidInput(err.to_string()))
}

fn to_points(value: i64) -> Result<u32, ServiceError> {
    u32::try_from(value).map_err(|_| {
        ServiceError::InvalidInput(format!("score must be non-negative, got {value}"))
    })
}
