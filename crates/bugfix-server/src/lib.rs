pub mod config;
pub mod error;
pub mod health;
pub mod matchmaker;
pub mod players;
pub mod registry;
pub mod session;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

/// Background task that drops games nobody has touched for
/// `games.idle_timeout_secs`.
pub fn spawn_idle_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.games.idle_timeout_secs);
    let period = Duration::from_secs(state.config.games.idle_check_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = state.registry.sweep_idle(max_idle).await;
            if removed > 0 {
                tracing::info!(removed, "Swept idle games");
            }
        }
    })
}
