use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use bugfix_core::net::messages::ServerMessage;
use bugfix_core::net::protocol::encode_server_message;

use crate::error::ActionError;
use crate::registry::PlayerSender;
use crate::session::SessionHandler;
use crate::state::{AppState, ConnectionGuard};

/// How long a closing connection may spend flushing queued replies.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    // Replies and pushes share one queue so a client sees them in the order
    // the server produced them.
    let (tx, rx) = mpsc::channel::<String>(state.config.limits.player_message_buffer);
    let session = SessionHandler::new(state.clone(), tx.clone());
    let conn_id = session.conn_id();
    tracing::info!(conn_id, "Client connected");

    let (stop_tx, stop_rx) = oneshot::channel();
    let mut writer = spawn_writer(ws_sender, rx, stop_rx);
    read_loop(&mut ws_receiver, &state, &session, &tx).await;

    // Games keep this connection's sender until they close or are swept, so
    // the writer has to be told to stop rather than waiting for the channel.
    let _ = stop_tx.send(());
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        tracing::debug!(conn_id, "Writer did not drain in time");
        writer.abort();
    }
    tracing::info!(conn_id, "Client disconnected");
}

/// Forward queued frames to the socket. On `stop`, refuse new frames, flush
/// what is already queued, and close the socket.
fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    mut stop: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(text) => {
                        if ws_sender.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    },
                    None => break,
                },
                _ = &mut stop => {
                    rx.close();
                    while let Some(text) = rx.recv().await {
                        if ws_sender.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    break;
                },
            }
        }
        let _ = ws_sender.close().await;
    })
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    /// A bucket refilling at `rate` per second. The burst always holds at
    /// least one whole token, so rates below 1/s still admit messages.
    fn per_second(rate: f64) -> Self {
        Self::new(rate.max(1.0), rate)
    }

    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    session: &SessionHandler,
    tx: &PlayerSender,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::per_second(rate);
    let conn_id = session.conn_id();

    while let Some(frame) = ws_receiver.next().await {
        let text = match frame {
            Ok(Message::Text(t)) => t.as_str().to_owned(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(t) => t,
                Err(_) => {
                    let err = ActionError::MalformedMessage("frame is not valid UTF-8".into());
                    if !reply(tx, &err.to_message()).await {
                        break;
                    }
                    continue;
                },
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(conn_id, error = %e, "WebSocket read error");
                break;
            },
        };

        if !rate_limiter.allow() {
            tracing::warn!(conn_id, "Rate limited");
            if !reply(tx, &ActionError::RateLimited.to_message()).await {
                break;
            }
            continue;
        }

        let response = session.handle_text(&text).await;
        if !reply(tx, &response).await {
            break;
        }
    }
}

/// Queue a direct reply. Returns false once the writer is gone.
async fn reply(tx: &PlayerSender, msg: &ServerMessage) -> bool {
    match encode_server_message(msg) {
        Ok(text) => tx.send(text).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode reply");
            true
        },
    }
}
