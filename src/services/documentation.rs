use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the tournament backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::viewer_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::tournament::get_state,
        crate::routes::tournament::reset_tournament,
        crate::routes::tournament::set_teams,
        crate::routes::tournament::start_match,
        crate::routes::tournament::set_theme,
        crate::routes::tournament::submit_challenge,
        crate::routes::tournament::submit_round,
        crate::routes::tournament::next_challenge,
        crate::routes::tournament::override_score,
        crate::routes::tournament::advance,
        crate::routes::tournament::reset_match,
        crate::routes::tournament::reset_round,
        crate::routes::tournament::export_state,
        crate::routes::tournament::sfx,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::tournament::TeamInput,
            crate::dto::tournament::SettingsInput,
            crate::dto::tournament::ResetRequest,
            crate::dto::tournament::MatchRequest,
            crate::dto::tournament::ThemeRequest,
            crate::dto::tournament::SubmitChallengeRequest,
            crate::dto::tournament::SubmitRoundRequest,
            crate::dto::tournament::OverrideScoreRequest,
            crate::dto::tournament::AdvanceRequest,
            crate::dto::tournament::SfxRequest,
            crate::dto::tournament::SfxResponse,
            crate::dto::tournament::ExportResponse,
            crate::dto::events::MatchStartEvent,
            crate::dto::events::ChallengeEvent,
            crate::dto::events::ScoreUpdateEvent,
            crate::dto::events::MatchAdvanceEvent,
            crate::dto::events::SfxEvent,
            crate::state::tournament::TournamentState,
            crate::state::tournament::Match,
            crate::state::tournament::Challenge,
            crate::state::tournament::Team,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tournament", description = "Tournament snapshot and roster"),
        (name = "match", description = "Running matches"),
        (name = "moderation", description = "Moderator corrections and resets"),
        (name = "viewers", description = "Realtime viewer streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_moderator_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/state",
            "/reset",
            "/start-match",
            "/submit-round",
            "/reset-round",
            "/sfx",
            "/health",
            "/ws",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
