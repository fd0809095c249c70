use std::sync::Arc;

use bugfix_core::game::GameId;

use crate::error::ActionError;
use crate::registry::GameRegistry;

/// Resolves `findGame` to the oldest game still waiting for an opponent.
///
/// The answer is advisory: nothing is reserved, and two players told about
/// the same game race at join time, where the registry lets exactly one win.
#[derive(Clone)]
pub struct Matchmaker {
    registry: Arc<GameRegistry>,
}

impl Matchmaker {
    pub fn new(registry: Arc<GameRegistry>) -> Self {
        Self { registry }
    }

    pub async fn find_open(&self) -> Result<GameId, ActionError> {
        self.registry
            .open_games()
            .await
            .into_iter()
            .next()
            .ok_or(ActionError::NoOpenGame)
    }
}
