use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse",
    tag = "viewers",
    responses(
        (
            status = 200,
            description = "Viewer event stream",
            content_type = "text/event-stream",
            body = String
        )
    )
)]
/// Stream tournament events to a viewer, starting with the full snapshot.
pub async fn viewer_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("New viewer SSE connection");
    sse_service::viewer_stream(state).await
}

/// Configure the SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse", get(viewer_stream))
}
