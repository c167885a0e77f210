use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{dto::events::ServerEvent, services::notifications, state::SharedState};

/// Open a viewer SSE stream: the current snapshot first, then every broadcast.
pub async fn viewer_stream(
    state: SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribing under the engine lock keeps the snapshot ordered before
    // any event broadcast after it.
    let (mut receiver, initial) = state
        .read_engine(|engine| (state.subscribe(), notifications::state_update(engine.state())))
        .await;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(event) = initial {
            if tx.send(Ok(to_sse_event(event))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_sse_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(skipped, "SSE viewer lagging; events dropped");
                            continue;
                        }
                    }
                }
            }
        }

        info!("SSE viewer disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(payload: ServerEvent) -> Event {
    Event::default().event(payload.event.as_str()).data(payload.data_text())
}
