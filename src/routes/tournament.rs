use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::tournament::{
        AdvanceRequest, ExportResponse, MatchRequest, OverrideScoreRequest, ResetRequest,
        SfxRequest, SfxResponse, SubmitChallengeRequest, SubmitRoundRequest, TeamInput,
        ThemeRequest,
    },
    error::AppError,
    services::tournament_service,
    state::{
        SharedState,
        tournament::{Challenge, Match, TournamentState},
    },
};

/// Moderator endpoints driving the tournament.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/reset", post(reset_tournament))
        .route("/teams", post(set_teams))
        .route("/start-match", post(start_match))
        .route("/theme", post(set_theme))
        .route("/submit-challenge", post(submit_challenge))
        .route("/submit-round", post(submit_round))
        .route("/next-challenge", post(next_challenge))
        .route("/override-score", post(override_score))
        .route("/advance", post(advance))
        .route("/reset-match", post(reset_match))
        .route("/reset-round", post(reset_round))
        .route("/export", post(export_state))
        .route("/sfx", post(sfx))
}

/// Return the full tournament snapshot.
#[utoipa::path(
    get,
    path = "/state",
    tag = "tournament",
    responses((status = 200, description = "Current snapshot", body = TournamentState))
)]
pub async fn get_state(State(state): State<SharedState>) -> Json<TournamentState> {
    Json(tournament_service::get_state(&state).await)
}

/// Rebuild the tournament from the given or current roster.
#[utoipa::path(
    post,
    path = "/reset",
    tag = "tournament",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Tournament reset", body = TournamentState),
        (status = 400, description = "Invalid roster or settings")
    )
)]
pub async fn reset_tournament(
    State(state): State<SharedState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<TournamentState>, AppError> {
    Ok(Json(tournament_service::reset_tournament(&state, payload).await?))
}

/// Replace the roster while keeping known scores.
#[utoipa::path(
    post,
    path = "/teams",
    tag = "tournament",
    request_body = [TeamInput],
    responses(
        (status = 200, description = "Roster replaced", body = TournamentState),
        (status = 400, description = "Invalid roster")
    )
)]
pub async fn set_teams(
    State(state): State<SharedState>,
    Json(payload): Json<Vec<TeamInput>>,
) -> Result<Json<TournamentState>, AppError> {
    Ok(Json(tournament_service::set_teams(&state, payload).await?))
}

/// Start a pending match.
#[utoipa::path(
    post,
    path = "/start-match",
    tag = "match",
    request_body = MatchRequest,
    responses(
        (status = 200, description = "Match started", body = Match),
        (status = 404, description = "Unknown match"),
        (status = 409, description = "Match not ready or already started"),
        (status = 422, description = "No content to draw from")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(tournament_service::start_match(&state, payload).await?))
}

/// Draw a challenge, optionally from an explicit theme.
#[utoipa::path(
    post,
    path = "/theme",
    tag = "match",
    request_body = ThemeRequest,
    responses(
        (status = 200, description = "Challenge drawn", body = Challenge),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn set_theme(
    State(state): State<SharedState>,
    Json(payload): Json<ThemeRequest>,
) -> Result<Json<Challenge>, AppError> {
    Ok(Json(tournament_service::set_theme(&state, payload).await?))
}

/// Record one team's result for the current challenge.
#[utoipa::path(
    post,
    path = "/submit-challenge",
    tag = "match",
    request_body = SubmitChallengeRequest,
    responses(
        (status = 200, description = "Round scored", body = Match),
        (status = 400, description = "Unknown side or result"),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn submit_challenge(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitChallengeRequest>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(tournament_service::submit_challenge(&state, payload).await?))
}

/// Record both teams' results for the current challenge.
#[utoipa::path(
    post,
    path = "/submit-round",
    tag = "match",
    request_body = SubmitRoundRequest,
    responses(
        (status = 200, description = "Round scored", body = Match),
        (status = 400, description = "Unknown result"),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn submit_round(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitRoundRequest>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(tournament_service::submit_round(&state, payload).await?))
}

/// Replace the current challenge without scoring.
#[utoipa::path(
    post,
    path = "/next-challenge",
    tag = "match",
    request_body = MatchRequest,
    responses(
        (status = 200, description = "Challenge replaced", body = Match),
        (status = 409, description = "Match not in progress")
    )
)]
pub async fn next_challenge(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(tournament_service::next_challenge(&state, payload).await?))
}

/// Correct match points or leaderboard scores.
#[utoipa::path(
    post,
    path = "/override-score",
    tag = "moderation",
    request_body = OverrideScoreRequest,
    responses(
        (status = 200, description = "Scores updated", body = TournamentState),
        (status = 404, description = "Unknown match or team")
    )
)]
pub async fn override_score(
    State(state): State<SharedState>,
    Json(payload): Json<OverrideScoreRequest>,
) -> Result<Json<TournamentState>, AppError> {
    Ok(Json(tournament_service::override_score(&state, payload).await?))
}

/// Force a winner for a match.
#[utoipa::path(
    post,
    path = "/advance",
    tag = "moderation",
    request_body = AdvanceRequest,
    responses(
        (status = 200, description = "Match completed", body = TournamentState),
        (status = 400, description = "Winner does not play in the match"),
        (status = 409, description = "Match not ready or already completed")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<TournamentState>, AppError> {
    Ok(Json(tournament_service::advance(&state, payload).await?))
}

/// Clear a match and every match downstream of it.
#[utoipa::path(
    post,
    path = "/reset-match",
    tag = "moderation",
    request_body = MatchRequest,
    responses(
        (status = 200, description = "Match reset", body = TournamentState),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn reset_match(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<TournamentState>, AppError> {
    Ok(Json(tournament_service::reset_match(&state, payload).await?))
}

/// Withdraw the current challenge of a match.
#[utoipa::path(
    post,
    path = "/reset-round",
    tag = "moderation",
    request_body = MatchRequest,
    responses(
        (status = 200, description = "Round rolled back", body = Match),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn reset_round(
    State(state): State<SharedState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(tournament_service::reset_round(&state, payload).await?))
}

/// Export the snapshot as pretty JSON.
#[utoipa::path(
    post,
    path = "/export",
    tag = "moderation",
    responses((status = 200, description = "Exported snapshot", body = ExportResponse))
)]
pub async fn export_state(
    State(state): State<SharedState>,
) -> Result<Json<ExportResponse>, AppError> {
    Ok(Json(tournament_service::export_state(&state).await?))
}

/// Play a sound cue on every viewer.
#[utoipa::path(
    post,
    path = "/sfx",
    tag = "moderation",
    request_body = SfxRequest,
    responses((status = 200, description = "Cue relayed", body = SfxResponse))
)]
pub async fn sfx(
    State(state): State<SharedState>,
    Json(payload): Json<SfxRequest>,
) -> Result<Json<SfxResponse>, AppError> {
    Ok(Json(tournament_service::sfx(&state, payload).await?))
}
