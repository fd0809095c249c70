use serde::Deserialize;

/// Top-level server configuration, loaded from `bugfix.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub games: GamesConfig,
    pub auth: AuthFileConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            limits: LimitsConfig::default(),
            games: GamesConfig::default(),
            auth: AuthFileConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    /// Outbound queue depth per connection. Pushes to a full queue are dropped.
    pub player_message_buffer: usize,
    /// Largest accepted inbound text frame, in bytes.
    pub max_message_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 50.0,
            player_message_buffer: 64,
            max_message_size: bugfix_core::net::protocol::MAX_MESSAGE_SIZE,
        }
    }
}

/// Game lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    /// Games with no activity for this long are dropped by the sweeper.
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
    /// Starting snippets handed to creators. One is picked at random per game.
    pub seed_snippets: Vec<String>,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            idle_check_interval_secs: 60,
            seed_snippets: vec![
                "some code\nwith lines\naaaa".to_string(),
                "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}".to_string(),
                "for i in 0..10 {\n    println!(\"{i}\");\n}".to_string(),
            ],
        }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// When true, the first credential seen for a player name is remembered
    /// and later requests under that name must present the same one.
    pub register_players: bool,
}

impl ServerConfig {
    /// Check the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.limits.max_ws_connections == 0 {
            problems.push("limits.max_ws_connections must be > 0".to_string());
        }
        let rate = self.limits.ws_rate_limit_per_sec;
        if !(rate.is_finite() && rate > 0.0) {
            problems.push("limits.ws_rate_limit_per_sec must be a finite number > 0".to_string());
        }
        if self.limits.player_message_buffer == 0 {
            problems.push("limits.player_message_buffer must be > 0".to_string());
        }
        if self.limits.max_message_size == 0 {
            problems.push("limits.max_message_size must be > 0".to_string());
        }
        if self.games.idle_timeout_secs == 0 {
            problems.push("games.idle_timeout_secs must be > 0".to_string());
        }
        if self.games.idle_check_interval_secs == 0 {
            problems.push("games.idle_check_interval_secs must be > 0".to_string());
        }
        if self.games.seed_snippets.is_empty() {
            problems.push("games.seed_snippets must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Load config from `bugfix.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("bugfix.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from bugfix.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse bugfix.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No bugfix.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `BUGFIX_*` overrides from the given lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("BUGFIX_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(val) = var("BUGFIX_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = var("BUGFIX_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
        if let Some(val) = var("BUGFIX_IDLE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            self.games.idle_timeout_secs = n;
        }
        if let Some(val) = var("BUGFIX_REGISTER_PLAYERS")
            && let Ok(b) = val.parse::<bool>()
        {
            self.auth.register_players = b;
        }
    }
}
