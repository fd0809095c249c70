use tracing_subscriber::EnvFilter;

use bugfix_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load();
    if let Err(errors) = config.validate() {
        for e in &errors {
            tracing::error!(error = %e, "Invalid configuration");
        }
        std::process::exit(1);
    }

    let addr = config.listen_addr.clone();
    let (app, state) = bugfix_server::build_app(config);
    let sweeper = bugfix_server::spawn_idle_sweeper(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };

    tracing::info!(%addr, "Bug/fix server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    sweeper.abort();
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}
