use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod sse;
pub mod tournament;
pub mod websocket;

/// Compose all route trees and wire in the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(tournament::router())
        .merge(docs::router())
        .with_state(state)
}
