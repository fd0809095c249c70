use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;
use crate::verdict::{Outcome, score};

/// Opaque game identifier handed to clients as `gameId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// A fresh random identifier. Callers that need uniqueness against live
    /// games must still check for collisions.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Linear game lifecycle. Phases only ever advance by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Created, no opponent yet. The only phase matchmaking offers.
    AwaitingOpponent,
    /// Opponent present; the creator must submit the bug.
    AwaitingBug,
    /// Bug stored; the joiner must submit the fix.
    BugSubmitted,
    /// Fix stored; scoring pending.
    FixSubmitted,
    /// Scored. No further transitions.
    Closed,
}

/// Rejected transition. The game is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// A second player already holds the joiner slot.
    AlreadyFull,
    /// Wrong player for this action, or the action is out of phase order.
    WrongTurn(&'static str),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyFull => write!(f, "game already has two players"),
            Self::WrongTurn(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for GameError {}

/// One match between a creator and a joiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    phase: Phase,
    creator: Identity,
    joiner: Option<Identity>,
    seed_code: Vec<String>,
    bug_code: Option<Vec<String>>,
    fix_code: Option<Vec<String>>,
    outcome: Option<Outcome>,
}

impl Game {
    /// Create a game with a freshly generated id.
    pub fn new(creator: Identity, seed_code: Vec<String>) -> Self {
        Self::with_id(GameId::generate(), creator, seed_code)
    }

    pub fn with_id(id: GameId, creator: Identity, seed_code: Vec<String>) -> Self {
        Self {
            id,
            phase: Phase::AwaitingOpponent,
            creator,
            joiner: None,
            seed_code,
            bug_code: None,
            fix_code: None,
            outcome: None,
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn creator(&self) -> &Identity {
        &self.creator
    }

    pub fn joiner(&self) -> Option<&Identity> {
        self.joiner.as_ref()
    }

    pub fn seed_code(&self) -> &[String] {
        &self.seed_code
    }

    pub fn bug_code(&self) -> Option<&[String]> {
        self.bug_code.as_deref()
    }

    pub fn fix_code(&self) -> Option<&[String]> {
        self.fix_code.as_deref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::AwaitingOpponent
    }

    /// Close the game without a result. Every later transition is rejected.
    pub fn abandon(&mut self) {
        self.phase = Phase::Closed;
    }

    /// Take the joiner slot.
    pub fn join(&mut self, player: Identity) -> Result<(), GameError> {
        if self.phase != Phase::AwaitingOpponent {
            return Err(GameError::AlreadyFull);
        }
        if player == self.creator {
            return Err(GameError::WrongTurn("the creator cannot join their own game"));
        }
        self.joiner = Some(player);
        self.phase = Phase::AwaitingBug;
        Ok(())
    }

    /// Store the creator's bugged code.
    pub fn submit_bug(&mut self, player: &Identity, code: Vec<String>) -> Result<(), GameError> {
        if *player != self.creator {
            return Err(GameError::WrongTurn("only the creator may submit a bug"));
        }
        match self.phase {
            Phase::AwaitingOpponent => Err(GameError::WrongTurn("no opponent has joined yet")),
            Phase::AwaitingBug => {
                self.bug_code = Some(code);
                self.phase = Phase::BugSubmitted;
                Ok(())
            },
            _ => Err(GameError::WrongTurn("bug already submitted")),
        }
    }

    /// Store the joiner's fix.
    pub fn submit_fix(&mut self, player: &Identity, code: Vec<String>) -> Result<(), GameError> {
        if self.joiner.as_ref() != Some(player) {
            return Err(GameError::WrongTurn("only the joiner may submit a fix"));
        }
        match self.phase {
            Phase::BugSubmitted => {
                self.fix_code = Some(code);
                self.phase = Phase::FixSubmitted;
                Ok(())
            },
            Phase::AwaitingBug => Err(GameError::WrongTurn("no bug has been submitted yet")),
            _ => Err(GameError::WrongTurn("fix already submitted")),
        }
    }

    /// Score the fix against the bug and close the game.
    pub fn resolve(&mut self) -> Result<Outcome, GameError> {
        if self.phase != Phase::FixSubmitted {
            return Err(GameError::WrongTurn("game has no fix to score"));
        }
        let (Some(bug), Some(fix)) = (&self.bug_code, &self.fix_code) else {
            return Err(GameError::WrongTurn("game has no fix to score"));
        };
        let outcome = score(bug, fix);
        self.outcome = Some(outcome.clone());
        self.phase = Phase::Closed;
        Ok(outcome)
    }
}
