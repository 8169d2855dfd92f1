//! WebSocket transport — upgrade handler and frame relay
//!
//! Each connection gets a writer task that serializes outbound messages into
//! text frames, and an inbound text stream handed to a [`Session`].

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitStream;
use futures_util::{future, SinkExt, Stream, StreamExt};
use phoneos_protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::server::ServerState;
use crate::session::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: Arc<ServerState>) {
    let id = state.next_session_id();
    let (mut ws_tx, ws_rx) = socket.split();

    // Create channel for sending messages to the client
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<ServerMessage>();
    info!("Client connected (session {})", id);

    // Spawn writer task
    let writer = tokio::spawn(async move {
        while let Some(msg) = client_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize {} message: {}", msg.type_name(), e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    match Session::start(id, state.dispatcher.clone(), state.session, client_tx) {
        Ok(session) => session.run(text_frames(ws_rx)).await,
        Err(e) => warn!("Session {} failed to start: {}", id, e),
    }

    writer.abort();
    info!("Client disconnected (session {})", id);
}

/// Text payloads from the socket, ending at the first close frame or error
fn text_frames(ws_rx: SplitStream<WebSocket>) -> impl Stream<Item = String> {
    ws_rx
        .take_while(|msg| {
            let open = match msg {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(e) => {
                    warn!("WebSocket read error: {}", e);
                    false
                }
            };
            future::ready(open)
        })
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => {
                    debug!("Ignoring {}-byte binary frame", data.len());
                    None
                }
                _ => None, // ping/pong are answered by axum
            })
        })
}
