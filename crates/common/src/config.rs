//! Common configuration types for Quorum components.

use serde::{Deserialize, Serialize};

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_observability_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_observability_config_roundtrip() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logs: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ObservabilityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.log_level, "debug");
        assert!(parsed.json_logs);
    }
}
