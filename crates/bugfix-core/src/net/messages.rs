use serde::{Deserialize, Serialize};

use crate::game::GameId;
use crate::identity::Identity;
use crate::verdict::Outcome;

/// The verb of a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateGame,
    FindGame,
    JoinGame,
    Bug,
    Fix,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::CreateGame,
        Action::FindGame,
        Action::JoinGame,
        Action::Bug,
        Action::Fix,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateGame => "createGame",
            Self::FindGame => "findGame",
            Self::JoinGame => "joinGame",
            Self::Bug => "bug",
            Self::Fix => "fix",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    pub fn needs_game_id(self) -> bool {
        matches!(self, Self::JoinGame | Self::Bug | Self::Fix)
    }

    pub fn needs_code(self) -> bool {
        matches!(self, Self::Bug | Self::Fix)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated client request. Every variant carries exactly the fields its
/// action requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    CreateGame {
        player: Identity,
    },
    FindGame {
        player: Identity,
    },
    JoinGame {
        player: Identity,
        game_id: GameId,
    },
    Bug {
        player: Identity,
        game_id: GameId,
        code: Vec<String>,
    },
    Fix {
        player: Identity,
        game_id: GameId,
        code: Vec<String>,
    },
}

impl ClientRequest {
    pub fn action(&self) -> Action {
        match self {
            Self::CreateGame { .. } => Action::CreateGame,
            Self::FindGame { .. } => Action::FindGame,
            Self::JoinGame { .. } => Action::JoinGame,
            Self::Bug { .. } => Action::Bug,
            Self::Fix { .. } => Action::Fix,
        }
    }

    pub fn player(&self) -> &Identity {
        match self {
            Self::CreateGame { player }
            | Self::FindGame { player }
            | Self::JoinGame { player, .. }
            | Self::Bug { player, .. }
            | Self::Fix { player, .. } => player,
        }
    }

    pub fn game_id(&self) -> Option<&GameId> {
        match self {
            Self::CreateGame { .. } | Self::FindGame { .. } => None,
            Self::JoinGame { game_id, .. }
            | Self::Bug { game_id, .. }
            | Self::Fix { game_id, .. } => Some(game_id),
        }
    }
}

/// Reply to `createGame` and `findGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRefMsg {
    #[serde(rename = "gameId")]
    pub game_id: GameId,
}

/// Reply to a successful `joinGame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedMsg {
    pub joined: bool,
    #[serde(rename = "gameId")]
    pub game_id: GameId,
    /// Creator's display name.
    pub opponent: String,
}

/// Reply to a successful `bug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedMsg {
    pub accepted: bool,
}

/// Uniform failure envelope. `error` is the only key clients need to check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub error: String,
    pub code: String,
}

/// Unsolicited notifications pushed to the other participant of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventMsg {
    /// To the creator: someone joined, here is the snippet to bug.
    #[serde(rename = "opponentJoined")]
    OpponentJoined {
        #[serde(rename = "gameId")]
        game_id: GameId,
        opponent: String,
        code: String,
    },
    /// To the joiner: the creator's bugged snippet, to be fixed.
    #[serde(rename = "bugSubmitted")]
    BugSubmitted {
        #[serde(rename = "gameId")]
        game_id: GameId,
        code: String,
    },
    /// To the creator: the fix has been scored.
    #[serde(rename = "result")]
    Result {
        #[serde(rename = "gameId")]
        game_id: GameId,
        #[serde(flatten)]
        outcome: Outcome,
    },
}

/// Everything the server sends over a session.
///
/// Serialized without a wrapper; variants are told apart by their keys, so
/// the order below is also the decode priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Error(ErrorMsg),
    Event(EventMsg),
    Joined(JoinedMsg),
    Result(Outcome),
    Accepted(AcceptedMsg),
    GameRef(GameRefMsg),
}

