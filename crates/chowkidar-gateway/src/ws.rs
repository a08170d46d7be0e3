// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket bridge from the event bus to dashboard clients.
//!
//! `WS /api/ws/{channel}` where channel is `owner` or a session id.
//! Server-to-client messages are the bus events serialized with their
//! `type` discriminator; client-to-server messages are ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(channel): Path<String>,
    State(state): State<GatewayState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, channel, state))
}

/// Forward bus events for one channel until the client disconnects.
async fn handle_socket(socket: WebSocket, channel: String, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.orchestrator.bus().subscribe(&channel);

    debug!(channel = channel.as_str(), "websocket subscriber connected");

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    // Slow subscriber: the oldest events were dropped.
                    debug!(channel = channel.as_str(), skipped, "websocket subscriber lagged");
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                // Client-to-server messages are ignored by contract.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(channel = channel.as_str(), "websocket subscriber disconnected");
}
