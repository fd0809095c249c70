use bugfix_core::game::{GameError, GameId};
use bugfix_core::identity::Identity;
use bugfix_core::net::messages::{
    AcceptedMsg, ClientRequest, EventMsg, GameRefMsg, JoinedMsg, ServerMessage,
};
use bugfix_core::net::protocol::{decode_client_request_limited, join_code};

use crate::error::ActionError;
use crate::registry::{ConnectionId, PlayerSender, Subscriber};
use crate::state::AppState;

/// Per-connection request handler.
///
/// Owns nothing shared: every game operation goes through the registry in
/// [`AppState`]. Replies are returned to the caller; pushes to the other
/// participant go through that participant's connection queue.
pub struct SessionHandler {
    state: AppState,
    conn_id: ConnectionId,
    outbound: PlayerSender,
}

impl SessionHandler {
    pub fn new(state: AppState, outbound: PlayerSender) -> Self {
        let conn_id = state.alloc_connection_id();
        Self {
            state,
            conn_id,
            outbound,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    fn subscriber(&self) -> Subscriber {
        Subscriber {
            conn_id: self.conn_id,
            sender: self.outbound.clone(),
        }
    }

    /// Decode, authorize, and execute one text frame. Always produces a
    /// reply; failures become the error envelope.
    pub async fn handle_text(&self, text: &str) -> ServerMessage {
        match self.process(text).await {
            Ok(reply) => reply,
            Err(ActionError::NoOpenGame) => {
                tracing::debug!(conn_id = self.conn_id, "No open game to offer");
                ActionError::NoOpenGame.to_message()
            },
            Err(e) => {
                tracing::warn!(conn_id = self.conn_id, code = e.kind(), error = %e, "Action rejected");
                e.to_message()
            },
        }
    }

    async fn process(&self, text: &str) -> Result<ServerMessage, ActionError> {
        let request =
            decode_client_request_limited(text, self.state.config.limits.max_message_size)?;
        self.state.players.check(request.player()).await?;
        self.dispatch(request).await
    }

    /// Route a validated request to its operation.
    pub async fn dispatch(&self, request: ClientRequest) -> Result<ServerMessage, ActionError> {
        match request {
            ClientRequest::CreateGame { player } => self.create_game(player).await,
            ClientRequest::FindGame { .. } => self.find_game().await,
            ClientRequest::JoinGame { player, game_id } => self.join_game(player, game_id).await,
            ClientRequest::Bug {
                player,
                game_id,
                code,
            } => self.submit_bug(player, game_id, code).await,
            ClientRequest::Fix {
                player,
                game_id,
                code,
            } => self.submit_fix(player, game_id, code).await,
        }
    }

    async fn create_game(&self, player: Identity) -> Result<ServerMessage, ActionError> {
        let name = player.name.clone();
        let seed = self.state.pick_seed_code();
        let game_id = self
            .state
            .registry
            .create(player, seed, self.subscriber())
            .await;
        tracing::info!(conn_id = self.conn_id, game_id = %game_id, player = %name, "Game created");
        Ok(ServerMessage::GameRef(GameRefMsg { game_id }))
    }

    async fn find_game(&self) -> Result<ServerMessage, ActionError> {
        let game_id = self.state.matchmaker.find_open().await?;
        Ok(ServerMessage::GameRef(GameRefMsg { game_id }))
    }

    async fn join_game(
        &self,
        player: Identity,
        game_id: GameId,
    ) -> Result<ServerMessage, ActionError> {
        let conn_id = self.conn_id;
        let subscriber = self.subscriber();
        let opponent = self
            .state
            .registry
            .mutate(&game_id, |entry| {
                entry
                    .game
                    .join(player.clone())
                    .map_err(|e| ActionError::from_game_error(e, &game_id))?;
                entry.set_joiner_conn(subscriber);
                entry.notify_creator(
                    conn_id,
                    &ServerMessage::Event(EventMsg::OpponentJoined {
                        game_id: game_id.clone(),
                        opponent: player.name.clone(),
                        code: join_code(entry.game.seed_code()),
                    }),
                );
                Ok(entry.game.creator().name.clone())
            })
            .await?;
        tracing::info!(conn_id, game_id = %game_id, player = %player.name, "Player joined game");
        Ok(ServerMessage::Joined(JoinedMsg {
            joined: true,
            game_id,
            opponent,
        }))
    }

    async fn submit_bug(
        &self,
        player: Identity,
        game_id: GameId,
        code: Vec<String>,
    ) -> Result<ServerMessage, ActionError> {
        let conn_id = self.conn_id;
        let text = join_code(&code);
        self.state
            .registry
            .mutate(&game_id, |entry| {
                entry
                    .game
                    .submit_bug(&player, code)
                    .map_err(|e| ActionError::from_game_error(e, &game_id))?;
                entry.notify_joiner(
                    conn_id,
                    &ServerMessage::Event(EventMsg::BugSubmitted {
                        game_id: game_id.clone(),
                        code: text,
                    }),
                );
                Ok(())
            })
            .await?;
        tracing::info!(conn_id, game_id = %game_id, player = %player.name, "Bug submitted");
        Ok(ServerMessage::Accepted(AcceptedMsg { accepted: true }))
    }

    async fn submit_fix(
        &self,
        player: Identity,
        game_id: GameId,
        code: Vec<String>,
    ) -> Result<ServerMessage, ActionError> {
        let conn_id = self.conn_id;
        let outcome = self
            .state
            .registry
            .mutate(&game_id, |entry| {
                let to_action = |e: GameError| ActionError::from_game_error(e, &game_id);
                entry.game.submit_fix(&player, code).map_err(to_action)?;
                let outcome = entry.game.resolve().map_err(to_action)?;
                entry.notify_creator(
                    conn_id,
                    &ServerMessage::Event(EventMsg::Result {
                        game_id: game_id.clone(),
                        outcome: outcome.clone(),
                    }),
                );
                Ok(outcome)
            })
            .await?;
        self.state.registry.remove(&game_id).await;
        tracing::info!(
            conn_id,
            game_id = %game_id,
            player = %player.name,
            verdict = %outcome.verdict,
            "Game closed"
        );
        Ok(ServerMessage::Result(outcome))
    }
}
