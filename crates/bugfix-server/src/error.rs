use bugfix_core::game::{GameError, GameId};
use bugfix_core::net::messages::{ErrorMsg, ServerMessage};
use bugfix_core::net::protocol::ProtocolError;

/// Every way a client action can fail. None of these close the connection;
/// the session turns each one into an [`ErrorMsg`] reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    NotFound(GameId),
    AlreadyFull(GameId),
    WrongTurn(String),
    NoOpenGame,
    MalformedMessage(String),
    UnknownAction(String),
    BadCredentials,
    RateLimited,
}

impl ActionError {
    /// Stable machine-readable kind, sent as the `code` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::AlreadyFull(_) => "AlreadyFull",
            Self::WrongTurn(_) => "WrongTurn",
            Self::NoOpenGame => "NoOpenGame",
            Self::MalformedMessage(_) => "MalformedMessage",
            Self::UnknownAction(_) => "UnknownAction",
            Self::BadCredentials => "BadCredentials",
            Self::RateLimited => "RateLimited",
        }
    }

    pub fn from_game_error(err: GameError, game_id: &GameId) -> Self {
        match err {
            GameError::AlreadyFull => Self::AlreadyFull(game_id.clone()),
            GameError::WrongTurn(reason) => Self::WrongTurn(reason.to_string()),
        }
    }

    /// The error envelope sent back to the client.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error(ErrorMsg {
            error: self.to_string(),
            code: self.kind().to_string(),
        })
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "NotFound: no live game with id {id}"),
            Self::AlreadyFull(id) => write!(f, "AlreadyFull: game {id} already has two players"),
            Self::WrongTurn(reason) => write!(f, "WrongTurn: {reason}"),
            Self::NoOpenGame => write!(f, "no open game"),
            Self::MalformedMessage(m) => write!(f, "MalformedMessage: {m}"),
            Self::UnknownAction(_) => write!(f, "unknown action"),
            Self::BadCredentials => write!(f, "BadCredentials: wrong password for this player"),
            Self::RateLimited => write!(f, "RateLimited: too many messages, slow down"),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ProtocolError> for ActionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownAction(action) => Self::UnknownAction(action),
            other => Self::MalformedMessage(other.to_string()),
        }
    }
}
