//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a LatticeDB client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Database path, e.g. "/ru/home/app/db".
    pub database: String,
    /// Whether to keep only TLS endpoints from discovery.
    pub use_ssl: bool,
    /// Discovery refresh interval in milliseconds.
    pub discovery_interval_ms: u64,
    /// Per-refresh RPC timeout in milliseconds.
    pub discovery_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            use_ssl: false,
            discovery_interval_ms: 60_000,
            discovery_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.discovery_interval(), Duration::from_secs(60));
        assert_eq!(cfg.discovery_timeout(), Duration::from_secs(10));
        assert!(!cfg.use_ssl);
    }

    #[test]
    fn test_config_serialization() {
        let cfg = ClientConfig {
            database: "/local/db".to_string(),
            ..ClientConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let decoded: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.database, cfg.database);
        assert_eq!(decoded.discovery_interval_ms, cfg.discovery_interval_ms);
    }
}
