use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{services::notifications, state::SharedState};

/// Handle the full lifecycle of a viewer WebSocket connection.
///
/// Viewers only listen: the current snapshot is sent first, then every
/// broadcast. Inbound text is ignored, pings are answered.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Registering and sending the snapshot under the engine lock keeps the
    // first frame ordered before any later broadcast.
    let viewer_id = state
        .read_engine(|engine| {
            let id = state.register_viewer(outbound_tx.clone());
            if let Some(event) = notifications::state_update(engine.state()) {
                let _ = outbound_tx.send(Message::Text(event.to_ws_text().into()));
            }
            id
        })
        .await;
    info!(viewer = %viewer_id, "viewer connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(viewer = %viewer_id, payload = %text, "ignoring viewer message");
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(viewer = %viewer_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.remove_viewer(&viewer_id);
    info!(viewer = %viewer_id, "viewer disconnected");

    finalize(writer_task, outbound_tx).await;
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
