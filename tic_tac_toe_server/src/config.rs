use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub space_ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3000,
            space_ttl: Duration::from_secs(1200),     // 20 minutes
            cleanup_interval: Duration::from_secs(600), // 10 minutes
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`, `SPACE_TTL_SECS` and `CLEANUP_INTERVAL_SECS`, keeping the
    /// default for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            port: env_parse("PORT").unwrap_or(defaults.port),
            space_ttl: env_parse("SPACE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.space_ttl),
            cleanup_interval: env_parse("CLEANUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
