use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use bugfix_core::game::GameId;
use bugfix_core::identity::Identity;
use bugfix_core::net::messages::{ErrorMsg, ServerMessage};
use bugfix_core::net::protocol::decode_server_message;

use bugfix_server::build_app;
use bugfix_server::config::ServerConfig;
use bugfix_server::state::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Build a request object the way a client would.
pub fn request(action: &str, player: &Identity, game_id: Option<&GameId>, code: Option<&str>) -> Value {
    let mut msg = json!({
        "action": action,
        "player": { "name": player.name, "passWord": player.credential },
    });
    if let Some(id) = game_id {
        msg["gameId"] = id.as_str().into();
    }
    if let Some(code) = code {
        msg["code"] = code.into();
    }
    msg
}

pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream.send(Message::Text(text.into())).await.unwrap();
}

pub async fn ws_send_json(stream: &mut WsStream, value: &Value) {
    ws_send_text(stream, &value.to_string()).await;
}

/// Send a request and read the next message.
pub async fn ws_call(stream: &mut WsStream, value: &Value) -> ServerMessage {
    ws_send_json(stream, value).await;
    ws_read_server_msg(stream).await
}

/// Read the next text frame (5s timeout).
pub async fn ws_read_text(stream: &mut WsStream) -> String {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read a text frame, returning None on timeout.
pub async fn ws_try_read_text(stream: &mut WsStream, timeout_ms: u64) -> Option<String> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let text = ws_read_text(stream).await;
    decode_server_message(&text).unwrap()
}

/// Read the next message as raw JSON (5s timeout).
pub async fn ws_read_json(stream: &mut WsStream) -> Value {
    let text = ws_read_text(stream).await;
    serde_json::from_str(&text).unwrap()
}

/// Unwrap an error envelope, panicking on anything else.
pub fn expect_error(msg: ServerMessage) -> ErrorMsg {
    match msg {
        ServerMessage::Error(e) => e,
        other => panic!("Expected error, got: {other:?}"),
    }
}

/// Send `createGame` and return the new game id.
pub async fn ws_create_game(stream: &mut WsStream, player: &Identity) -> GameId {
    match ws_call(stream, &request("createGame", player, None, None)).await {
        ServerMessage::GameRef(r) => r.game_id,
        other => panic!("Expected GameRef, got: {other:?}"),
    }
}
