use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::EventChange;
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    /// Only changes for this event; all events when absent.
    pub event_id: Option<Uuid>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<SubscribeParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.events_tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, params.event_id))
}

async fn handle_socket(
    socket: WebSocket,
    mut rx: broadcast::Receiver<EventChange>,
    event_id: Option<Uuid>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Clients never send anything meaningful; drain until they close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            let change = match rx.recv().await {
                Ok(change) => change,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket subscriber lagged behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if event_id.is_some_and(|id| id != change.event_id) {
                continue;
            }

            let payload = match serde_json::to_string(&change) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Failed to encode event change: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }
}
