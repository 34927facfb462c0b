//! WebSocket stream of graph change events

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use pylon_core::GraphEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ServerState;

/// Messages exchanged with the tree viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// First message on every connection
    Hello {
        #[serde(rename = "rootPath")]
        root_path: String,
        files: usize,
    },
    /// A store event, forwarded as-is
    Graph { event: GraphEvent },
    /// Events were dropped because the client fell behind; refetch
    Resync { skipped: u64 },
    Ping,
    Pong,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("websocket client connected");

    let (mut sender, mut receiver) = socket.split();
    // subscribed before the snapshot is read
    let mut events = state.indexer.store().subscribe();

    let hello = WsMessage::Hello {
        root_path: state.indexer.root_path().to_string_lossy().into_owned(),
        files: state.indexer.snapshot().await.len(),
    };
    if send_json(&mut sender, &hello).await.is_err() {
        warn!("failed to greet websocket client");
        return;
    }

    let (pong_tx, mut pong_rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Ping) => {
                        if pong_tx.send(()).is_err() {
                            break;
                        }
                    }
                    Ok(other) => debug!("ignoring client message {other:?}"),
                    Err(e) => warn!("unparseable websocket message: {e}"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => WsMessage::Graph { event },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("websocket client lagged by {skipped} events");
                        WsMessage::Resync { skipped }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(()) = pong_rx.recv() => WsMessage::Pong,
            };
            if send_json(&mut sender, &outgoing).await.is_err() {
                debug!("websocket client went away");
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("websocket connection closed");
}

async fn send_json<S>(sender: &mut S, message: &WsMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|e| warn!("failed to serialize {message:?}: {e}"))?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
