//! `/ws`: a chat-style relay. Every text frame a client sends is broadcast to
//! all connected clients.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 100;

/// Fan-out channel shared by all websocket sessions.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Sends to every subscriber. Returns how many received it.
    pub fn publish(&self, message: String) -> usize {
        self.tx.send(message).unwrap_or(0)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /ws
pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state.broadcaster))
}

async fn client_session(socket: WebSocket, broadcaster: Broadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = broadcaster.subscribe();
    info!("WebSocket client connected");

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if sender.send(Message::Text(message)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {skipped} messages");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let relay = broadcaster.clone();
    let mut incoming = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    relay.publish(format!("Message: {text}"));
                }
                Message::Close(_) => break,
                _ => debug!("Ignoring non-text websocket frame"),
            }
        }
    });

    // Whichever side finishes first ends the session.
    tokio::select! {
        _ = &mut forward => incoming.abort(),
        _ = &mut incoming => forward.abort(),
    }

    broadcaster.publish("Client disconnected".to_string());
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let broadcaster = Broadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        assert_eq!(broadcaster.publish("Message: hi".to_string()), 2);
        assert_eq!(a.recv().await.unwrap(), "Message: hi");
        assert_eq!(b.recv().await.unwrap(), "Message: hi");
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        assert_eq!(Broadcaster::new().publish("nobody".to_string()), 0);
    }
}
