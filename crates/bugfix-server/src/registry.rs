use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};

use bugfix_core::game::{Game, GameId, Phase};
use bugfix_core::identity::Identity;
use bugfix_core::net::messages::ServerMessage;
use bugfix_core::net::protocol::encode_server_message;

use crate::error::ActionError;

/// Process-unique id of one WebSocket connection.
pub type ConnectionId = u64;

/// Per-connection sender for outbound JSON text frames.
/// Bounded so a slow client cannot grow server memory without limit.
pub type PlayerSender = mpsc::Sender<String>;

/// A connection that wants pushes for one side of a game.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub conn_id: ConnectionId,
    pub sender: PlayerSender,
}

impl Subscriber {
    /// Push a message unless `from` is this same connection (the actor
    /// already gets a direct reply).
    fn push(&self, from: ConnectionId, game_id: &GameId, msg: &ServerMessage) {
        if self.conn_id == from {
            return;
        }
        match encode_server_message(msg) {
            Ok(text) => {
                if let Err(e) = self.sender.try_send(text) {
                    tracing::debug!(
                        conn_id = self.conn_id, game_id = %game_id, error = %e,
                        "Dropping push to slow or disconnected client"
                    );
                }
            },
            Err(e) => tracing::warn!(game_id = %game_id, error = %e, "Failed to encode push"),
        }
    }
}

/// A live game plus the connections subscribed to it.
pub struct GameEntry {
    pub game: Game,
    creator_conn: Subscriber,
    joiner_conn: Option<Subscriber>,
    last_activity: Instant,
}

impl GameEntry {
    pub fn set_joiner_conn(&mut self, subscriber: Subscriber) {
        self.joiner_conn = Some(subscriber);
    }

    pub fn notify_creator(&self, from: ConnectionId, msg: &ServerMessage) {
        self.creator_conn.push(from, self.game.id(), msg);
    }

    pub fn notify_joiner(&self, from: ConnectionId, msg: &ServerMessage) {
        if let Some(ref sub) = self.joiner_conn {
            sub.push(from, self.game.id(), msg);
        }
    }
}

struct Slot {
    /// Creation order, used for FIFO matchmaking.
    seq: u64,
    entry: Arc<Mutex<GameEntry>>,
}

#[derive(Default)]
struct Inner {
    games: HashMap<GameId, Slot>,
    next_seq: u64,
}

/// Game counts by lifecycle stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub open: usize,
    pub in_progress: usize,
    pub total: usize,
}

/// Owns every live game.
///
/// The map lock only guards insert/lookup/remove and is never held across a
/// game lock acquisition; each game's state is mutated under its own mutex,
/// so unrelated games never wait on each other.
#[derive(Default)]
pub struct GameRegistry {
    inner: RwLock<Inner>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a game awaiting an opponent and return its id.
    pub async fn create(
        &self,
        creator: Identity,
        seed_code: Vec<String>,
        subscriber: Subscriber,
    ) -> GameId {
        let mut inner = self.inner.write().await;
        let id = generate_unique_game_id(&inner.games);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let entry = GameEntry {
            game: Game::with_id(id.clone(), creator, seed_code),
            creator_conn: subscriber,
            joiner_conn: None,
            last_activity: Instant::now(),
        };
        inner.games.insert(
            id.clone(),
            Slot {
                seq,
                entry: Arc::new(Mutex::new(entry)),
            },
        );
        id
    }

    async fn entry(&self, id: &GameId) -> Result<Arc<Mutex<GameEntry>>, ActionError> {
        let inner = self.inner.read().await;
        inner
            .games
            .get(id)
            .map(|slot| Arc::clone(&slot.entry))
            .ok_or_else(|| ActionError::NotFound(id.clone()))
    }

    /// Snapshot of a game's current state.
    pub async fn get(&self, id: &GameId) -> Result<Game, ActionError> {
        let entry = self.entry(id).await?;
        let guard = entry.lock().await;
        Ok(guard.game.clone())
    }

    /// Apply `f` to a game while holding that game's lock. Nothing else can
    /// observe the game until `f` returns. Closed games count as gone.
    pub async fn mutate<T>(
        &self,
        id: &GameId,
        f: impl FnOnce(&mut GameEntry) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;
        if guard.game.phase() == Phase::Closed {
            return Err(ActionError::NotFound(id.clone()));
        }
        guard.last_activity = Instant::now();
        f(&mut guard)
    }

    /// Drop a game. Returns whether it was present.
    pub async fn remove(&self, id: &GameId) -> bool {
        self.inner.write().await.games.remove(id).is_some()
    }

    /// Ids of games still awaiting an opponent, oldest first.
    pub async fn open_games(&self) -> Vec<GameId> {
        let mut slots: Vec<(u64, GameId, Arc<Mutex<GameEntry>>)> = {
            let inner = self.inner.read().await;
            inner
                .games
                .iter()
                .map(|(id, slot)| (slot.seq, id.clone(), Arc::clone(&slot.entry)))
                .collect()
        };
        slots.sort_by_key(|(seq, ..)| *seq);

        let mut open = Vec::new();
        for (_, id, entry) in slots {
            if entry.lock().await.game.is_open() {
                open.push(id);
            }
        }
        open
    }

    /// Remove games idle for longer than `max_idle`. Games whose lock is
    /// currently held are in use and are kept. Removed games are closed under
    /// their own lock, so a caller that fetched the entry just before the
    /// sweep sees `NotFound`. Returns the number removed.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let before = inner.games.len();
        inner.games.retain(|_, slot| match slot.entry.try_lock() {
            Ok(mut entry) => {
                if now.duration_since(entry.last_activity) < max_idle {
                    return true;
                }
                entry.game.abandon();
                false
            },
            Err(_) => true,
        });
        before - inner.games.len()
    }

    pub async fn stats(&self) -> GameStats {
        let entries: Vec<Arc<Mutex<GameEntry>>> = {
            let inner = self.inner.read().await;
            inner.games.values().map(|s| Arc::clone(&s.entry)).collect()
        };
        let mut stats = GameStats {
            total: entries.len(),
            ..GameStats::default()
        };
        for entry in entries {
            if entry.lock().await.game.is_open() {
                stats.open += 1;
            } else {
                stats.in_progress += 1;
            }
        }
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.games.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Generate a game id, retrying on collision with a live game.
fn generate_unique_game_id(existing: &HashMap<GameId, Slot>) -> GameId {
    loop {
        let id = GameId::generate();
        if !existing.contains_key(&id) {
            return id;
        }
    }
}
