use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use clash_back::{
    config::AppConfig,
    dao::tournament_store::{MemoryStore, TournamentStore},
    dto::{
        events::ServerEvent,
        tournament::{MatchRequest, SfxRequest, SubmitRoundRequest},
    },
    error::ServiceError,
    routes,
    services::{notifications, tournament_service},
    state::{
        AppState, SharedState,
        draw::ContentPools,
        engine::TournamentEngine,
        tournament::{Challenge, MatchId, MatchStatus, Settings, Team, Theme},
    },
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::broadcast::{Receiver, error::TryRecvError};
use tower::ServiceExt;
use uuid::Uuid;

fn roster() -> Vec<Team> {
    (1..=8)
        .map(|n| Team {
            id: Uuid::from_u128(n),
            name: format!("Couple {n}"),
            players: vec![format!("Partner {n}a"), format!("Partner {n}b")],
            score: 0,
        })
        .collect()
}

fn content() -> Arc<ContentPools> {
    let pools = Theme::ALL
        .into_iter()
        .map(|theme| {
            let challenges = (0..12)
                .map(|n| Challenge {
                    id: format!("{theme}-{n}"),
                    theme,
                    prompt: format!("{theme} prompt {n}"),
                    answer: format!("{theme} answer {n}"),
                    metadata: None,
                })
                .collect();
            (theme, challenges)
        })
        .collect();
    Arc::new(pools)
}

fn app(store: &MemoryStore) -> SharedState {
    let engine = TournamentEngine::bootstrap(
        roster(),
        Settings::default(),
        content(),
        StdRng::seed_from_u64(7),
    )
    .unwrap();
    let store: Arc<dyn TournamentStore> = Arc::new(store.clone());
    AppState::with_engine(Arc::new(AppConfig::default()), store, engine)
}

fn qf1() -> MatchRequest {
    MatchRequest {
        match_id: "qf1".into(),
    }
}

fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => names.push(event.event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return names,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

#[tokio::test]
async fn starting_a_match_announces_then_publishes_snapshot() {
    let store = MemoryStore::new();
    let state = app(&store);
    let mut rx = state.subscribe();

    let started = tournament_service::start_match(&state, qf1()).await.unwrap();

    assert_eq!(started.status, MatchStatus::InProgress);
    assert!(started.current_challenge.is_some());
    assert_eq!(
        drain(&mut rx),
        vec![
            notifications::EVENT_MATCH_START,
            notifications::EVENT_STATE_UPDATE
        ]
    );
    let stored = store.stored().unwrap();
    assert_eq!(
        stored.state.find_match(MatchId::Qf1).unwrap().status,
        MatchStatus::InProgress
    );
}

#[tokio::test]
async fn playing_out_a_match_emits_score_and_advance_events() {
    let state = app(&MemoryStore::new());
    tournament_service::start_match(&state, qf1()).await.unwrap();
    let mut rx = state.subscribe();

    let mut last = None;
    for _ in 0..10 {
        let m = tournament_service::submit_round(
            &state,
            SubmitRoundRequest {
                match_id: "qf1".into(),
                team_a: "correct".into(),
                team_b: "wrong".into(),
            },
        )
        .await
        .unwrap();
        let done = m.status == MatchStatus::Completed;
        last = Some(m);
        if done {
            break;
        }
    }

    let finished = last.unwrap();
    assert_eq!(finished.status, MatchStatus::Completed);
    assert_eq!(finished.winner_id, Some(Uuid::from_u128(1)));

    let events = drain(&mut rx);
    assert_eq!(
        &events[events.len() - 3..],
        [
            notifications::EVENT_SCORE_UPDATE,
            notifications::EVENT_MATCH_ADVANCE,
            notifications::EVENT_STATE_UPDATE
        ]
    );
    assert!(
        !events[..events.len() - 3].contains(&notifications::EVENT_MATCH_ADVANCE.to_string())
    );

    let snapshot = tournament_service::get_state(&state).await;
    let semi = snapshot.find_match(MatchId::Sf1).unwrap();
    assert_eq!(semi.team_a.as_ref().map(|team| team.id), Some(Uuid::from_u128(1)));
}

#[tokio::test]
async fn failed_save_keeps_change_and_still_notifies() {
    let store = MemoryStore::new();
    let state = app(&store);
    let mut rx = state.subscribe();
    store.set_failing(true);

    let err = tournament_service::start_match(&state, qf1())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Persistence(_)));
    assert_eq!(
        drain(&mut rx),
        vec![
            notifications::EVENT_MATCH_START,
            notifications::EVENT_STATE_UPDATE
        ]
    );
    let snapshot = tournament_service::get_state(&state).await;
    assert_eq!(
        snapshot.find_match(MatchId::Qf1).unwrap().status,
        MatchStatus::InProgress
    );
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn rejected_operation_is_silent() {
    let store = MemoryStore::new();
    let state = app(&store);
    let mut rx = state.subscribe();

    let err = tournament_service::next_challenge(&state, qf1())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidState(_)));
    assert!(drain(&mut rx).is_empty());
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn round_rollback_only_announces_when_something_was_undone() {
    let store = MemoryStore::new();
    let state = app(&store);
    tournament_service::start_match(&state, qf1()).await.unwrap();
    let mut rx = state.subscribe();

    let rolled_back = tournament_service::reset_round(&state, qf1()).await.unwrap();
    assert!(rolled_back.current_challenge.is_none());
    assert!(rolled_back.used_challenge_ids.is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![
            notifications::EVENT_CHALLENGE_NEW,
            notifications::EVENT_STATE_UPDATE
        ]
    );

    store.set_failing(true);
    let again = tournament_service::reset_round(&state, qf1()).await.unwrap();
    assert_eq!(again, rolled_back);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn sound_cues_are_relayed_without_touching_storage() {
    let store = MemoryStore::new();
    let state = app(&store);
    let mut rx = state.subscribe();

    let response = tournament_service::sfx(
        &state,
        SfxRequest {
            event: " buzzer ".into(),
        },
    )
    .await
    .unwrap();

    assert!(response.ok);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.event, notifications::EVENT_SFX);
    assert_eq!(event.data["event"], "buzzer");
    assert!(store.stored().is_none());
}

async fn send(state: SharedState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = routes::router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn http_state_lists_bracket_in_topology_order() {
    let state = app(&MemoryStore::new());
    let (status, body) = send(
        state,
        Request::get("/state").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["bracket"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(ids[0], "qf1");
    assert_eq!(body["leaderboard"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn http_errors_map_to_status_codes() {
    let state = app(&MemoryStore::new());

    let (status, body) = send(
        state.clone(),
        post("/start-match", serde_json::json!({"matchId": "qf9"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("qf9"));

    let (status, _) = send(
        state.clone(),
        post("/start-match", serde_json::json!({"matchId": "qf1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        state.clone(),
        post(
            "/submit-challenge",
            serde_json::json!({"matchId": "qf1", "team": "C", "result": "correct"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        state.clone(),
        post("/start-match", serde_json::json!({"matchId": "qf1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        state,
        post("/start-match", serde_json::json!({"matchId": "final"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn http_persistence_failure_is_service_unavailable() {
    let store = MemoryStore::new();
    let state = app(&store);
    store.set_failing(true);

    let (status, _) = send(
        state.clone(),
        post("/start-match", serde_json::json!({"matchId": "qf2"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(
        state,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}
