// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Echo WebSocket channel
//!
//! Each connection gets a greeting, then every text frame is answered with
//! the same text behind a fixed prefix. Faults end only their own connection
//! and never produce an error frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, info, warn};

use crate::common::ApiState;

pub const GREETING: &str = "Connected to server";
pub const ECHO_PREFIX: &str = "Received: ";

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub fn echo_reply(text: &str) -> String {
    format!("{}{}", ECHO_PREFIX, text)
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    let idle_timeout = state.websocket.idle_timeout;
    ws.on_upgrade(move |socket| run_echo(socket, idle_timeout))
}

enum Next {
    Frame(Option<Result<Message, axum::Error>>),
    Idle,
}

async fn next_frame(socket: &mut WebSocket, idle_timeout: Option<Duration>) -> Next {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, socket.recv()).await {
            Ok(frame) => Next::Frame(frame),
            Err(_) => Next::Idle,
        },
        None => Next::Frame(socket.recv().await),
    }
}

async fn run_echo(mut socket: WebSocket, idle_timeout: Option<Duration>) {
    let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    info!(target: "warden-api", connection_id, "WebSocket client connected");

    if let Err(e) = socket.send(Message::Text(GREETING.to_string())).await {
        warn!(target: "warden-api", connection_id, "Failed to send greeting: {}", e);
        return;
    }

    loop {
        match next_frame(&mut socket, idle_timeout).await {
            Next::Frame(Some(Ok(Message::Text(text)))) => {
                debug!(target: "warden-api", connection_id, "Echoing {} bytes", text.len());
                if let Err(e) = socket.send(Message::Text(echo_reply(&text))).await {
                    warn!(target: "warden-api", connection_id, "WebSocket send failed: {}", e);
                    break;
                }
            }
            Next::Frame(Some(Ok(Message::Close(_)))) | Next::Frame(None) => {
                debug!(target: "warden-api", connection_id, "WebSocket client disconnected");
                break;
            }
            // Binary frames are ignored; ping/pong is answered by the transport
            Next::Frame(Some(Ok(_))) => {}
            Next::Frame(Some(Err(e))) => {
                warn!(target: "warden-api", connection_id, "WebSocket receive failed: {}", e);
                break;
            }
            Next::Idle => {
                debug!(target: "warden-api", connection_id, "Closing idle WebSocket connection");
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!(target: "warden-api", connection_id, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_reply() {
        assert_eq!(echo_reply("hello"), "Received: hello");
        assert_eq!(echo_reply(""), "Received: ");
    }
}
