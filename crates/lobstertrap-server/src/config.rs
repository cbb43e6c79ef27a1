use std::time::Duration;

use serde::Deserialize;

/// Top-level server configuration, loaded from `lobstertrap.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub timing: TimingConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            timing: TimingConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Phase durations. Discussion and voting are minutes-scale; reveal is a
/// short pause to show the elimination before the next round.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub discussion_secs: u64,
    pub voting_secs: u64,
    pub reveal_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            discussion_secs: 900,
            voting_secs: 180,
            reveal_secs: 10,
        }
    }
}

impl TimingConfig {
    pub fn discussion(&self) -> Duration {
        Duration::from_secs(self.discussion_secs)
    }

    pub fn voting(&self) -> Duration {
        Duration::from_secs(self.voting_secs)
    }

    pub fn reveal(&self) -> Duration {
        Duration::from_secs(self.reveal_secs)
    }
}

/// Boundary limits on client-supplied fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_name_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_name_chars: 64,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on fatal problems.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.timing.discussion_secs == 0 {
            tracing::error!("timing.discussion_secs must be > 0");
            std::process::exit(1);
        }
        if self.timing.voting_secs == 0 {
            tracing::error!("timing.voting_secs must be > 0");
            std::process::exit(1);
        }
        if self.timing.reveal_secs == 0 {
            tracing::error!("timing.reveal_secs must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_name_chars == 0 {
            tracing::error!("limits.max_name_chars must be > 0");
            std::process::exit(1);
        }
        if self.limits.request_timeout_secs == 0 {
            tracing::error!("limits.request_timeout_secs must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `lobstertrap.toml` if it exists, then apply env
    /// var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("lobstertrap.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from lobstertrap.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse lobstertrap.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No lobstertrap.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("LOBSTERTRAP_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("LOBSTERTRAP_DISCUSSION_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.timing.discussion_secs = n;
        }
        if let Ok(val) = std::env::var("LOBSTERTRAP_VOTING_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.timing.voting_secs = n;
        }
        if let Ok(val) = std::env::var("LOBSTERTRAP_REVEAL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.timing.reveal_secs = n;
        }

        config
    }
}
