use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use rand::seq::IndexedRandom;

use bugfix_core::net::protocol::split_code;

use crate::config::ServerConfig;
use crate::matchmaker::Matchmaker;
use crate::players::PlayerDirectory;
use crate::registry::{ConnectionId, GameRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
    pub matchmaker: Matchmaker,
    pub players: Arc<PlayerDirectory>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
    next_connection_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(GameRegistry::new()))
    }

    /// Build state around an existing registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<GameRegistry>) -> Self {
        Self {
            matchmaker: Matchmaker::new(Arc::clone(&registry)),
            registry,
            players: Arc::new(PlayerDirectory::new(config.auth.register_players)),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn alloc_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Pick the starting snippet for a new game.
    pub fn pick_seed_code(&self) -> Vec<String> {
        self.config
            .games
            .seed_snippets
            .choose(&mut rand::rng())
            .map(|s| split_code(s))
            .unwrap_or_default()
    }
}

/// Counts a live connection for as long as it is held.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}
