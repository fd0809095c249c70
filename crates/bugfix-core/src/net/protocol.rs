use serde_json::{Map, Value};

use crate::game::GameId;
use crate::identity::Identity;

use super::messages::{Action, ClientRequest, ServerMessage};

/// Default cap on an inbound text frame.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not JSON, not an object, or a required field is missing or mistyped.
    Malformed(String),
    /// `action` is present but names no known operation.
    UnknownAction(String),
    PayloadTooLarge(usize),
    SerializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(m) => write!(f, "{m}"),
            Self::UnknownAction(a) => write!(f, "unknown action: {a:?}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

fn missing(field: &str) -> ProtocolError {
    ProtocolError::Malformed(format!("missing field `{field}`"))
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<String, ProtocolError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(missing(field)),
        Some(_) => Err(ProtocolError::Malformed(format!(
            "field `{field}` must be a string"
        ))),
    }
}

/// Split submitted code into lines. `\r\n` endings are accepted.
pub fn split_code(code: &str) -> Vec<String> {
    code.lines().map(str::to_string).collect()
}

/// Inverse of [`split_code`] for sending code back to clients.
pub fn join_code(lines: &[String]) -> String {
    lines.join("\n")
}

/// Decode and validate a client request.
///
/// The action is resolved before any other field is looked at, so a request
/// with an unknown action is reported as such even if it is also incomplete.
pub fn decode_client_request(text: &str) -> Result<ClientRequest, ProtocolError> {
    decode_client_request_limited(text, MAX_MESSAGE_SIZE)
}

/// [`decode_client_request`] with a caller-supplied size cap.
pub fn decode_client_request_limited(
    text: &str,
    max_size: usize,
) -> Result<ClientRequest, ProtocolError> {
    if text.len() > max_size {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| ProtocolError::Malformed(format!("invalid JSON: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(ProtocolError::Malformed(
            "request must be a JSON object".to_string(),
        ));
    };

    let action_name = string_field(&obj, "action")?;
    let action =
        Action::from_wire(&action_name).ok_or(ProtocolError::UnknownAction(action_name))?;

    let player_value = obj.get("player").cloned().ok_or_else(|| missing("player"))?;
    let player: Identity = serde_json::from_value(player_value)
        .map_err(|e| ProtocolError::Malformed(format!("invalid field `player`: {e}")))?;

    let game_id = if action.needs_game_id() {
        Some(GameId(string_field(&obj, "gameId")?))
    } else {
        None
    };
    let code = if action.needs_code() {
        Some(split_code(&string_field(&obj, "code")?))
    } else {
        None
    };

    let request = match (action, game_id, code) {
        (Action::CreateGame, ..) => ClientRequest::CreateGame { player },
        (Action::FindGame, ..) => ClientRequest::FindGame { player },
        (Action::JoinGame, Some(game_id), _) => ClientRequest::JoinGame { player, game_id },
        (Action::Bug, Some(game_id), Some(code)) => ClientRequest::Bug {
            player,
            game_id,
            code,
        },
        (Action::Fix, Some(game_id), Some(code)) => ClientRequest::Fix {
            player,
            game_id,
            code,
        },
        (action, ..) => {
            return Err(ProtocolError::Malformed(format!(
                "incomplete `{action}` request"
            )));
        },
    };
    Ok(request)
}

/// Encode a `ServerMessage` as a JSON text frame.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Decode a server text frame. Used by clients and tests.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
