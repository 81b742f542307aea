//! Meeting coordinator configuration.
//!
//! Configuration is loaded from environment variables. The store URL and
//! API key are sensitive and redacted in Debug output.

use common::config::ObservabilityConfig;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default conferencing engine domain.
pub const DEFAULT_ENGINE_DOMAIN: &str = "meet.jit.si";

/// Default roster reconciliation debounce in milliseconds.
///
/// Long enough to coalesce a simultaneous join + role-change burst, short
/// enough that promotions become visible within one round trip.
pub const DEFAULT_ROSTER_DEBOUNCE_MS: u64 = 150;

/// Default periodic roster refresh in seconds (safety net for missed
/// engine events).
pub const DEFAULT_ROSTER_REFRESH_SECONDS: u64 = 3;

/// Default capacity of the coordinator's UI event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Meeting coordinator configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct CoordinatorConfig {
    /// Shared record store service URL.
    /// Protected by `SecretString` to prevent accidental logging.
    pub store_url: SecretString,

    /// Shared record store API key.
    /// Protected by `SecretString` to prevent accidental logging.
    pub store_api_key: SecretString,

    /// Conferencing engine domain (default: "meet.jit.si").
    pub engine_domain: String,

    /// Roster reconciliation debounce interval.
    pub roster_debounce: Duration,

    /// Periodic roster refresh interval.
    pub roster_refresh: Duration,

    /// Capacity of the coordinator's UI event channel.
    pub event_buffer: usize,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("store_url", &"[REDACTED]")
            .field("store_api_key", &"[REDACTED]")
            .field("engine_domain", &self.engine_domain)
            .field("roster_debounce", &self.roster_debounce)
            .field("roster_refresh", &self.roster_refresh)
            .field("event_buffer", &self.event_buffer)
            .field("observability", &self.observability)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store_url = SecretString::from(
            vars.get("QUORUM_STORE_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("QUORUM_STORE_URL".to_string()))?
                .clone(),
        );

        let store_api_key = SecretString::from(
            vars.get("QUORUM_STORE_API_KEY")
                .ok_or_else(|| ConfigError::MissingEnvVar("QUORUM_STORE_API_KEY".to_string()))?
                .clone(),
        );

        let engine_domain = vars
            .get("QUORUM_ENGINE_DOMAIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENGINE_DOMAIN.to_string());

        let roster_debounce_ms = vars
            .get("QUORUM_ROSTER_DEBOUNCE_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ROSTER_DEBOUNCE_MS);

        let roster_refresh_seconds = vars
            .get("QUORUM_ROSTER_REFRESH_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ROSTER_REFRESH_SECONDS);

        let event_buffer = vars
            .get("QUORUM_EVENT_BUFFER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EVENT_BUFFER);

        if event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "QUORUM_EVENT_BUFFER must be at least 1".to_string(),
            ));
        }

        let observability = ObservabilityConfig {
            log_level: vars
                .get("QUORUM_LOG_LEVEL")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
            json_logs: vars
                .get("QUORUM_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
        };

        Ok(CoordinatorConfig {
            store_url,
            store_api_key,
            engine_domain,
            roster_debounce: Duration::from_millis(roster_debounce_ms),
            roster_refresh: Duration::from_secs(roster_refresh_seconds),
            event_buffer,
            observability,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "QUORUM_STORE_URL".to_string(),
                "https://records.example.com".to_string(),
            ),
            (
                "QUORUM_STORE_API_KEY".to_string(),
                "svc-key-1234567890".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = base_vars();

        let config = CoordinatorConfig::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(
            config.store_url.expose_secret(),
            "https://records.example.com"
        );
        assert_eq!(config.engine_domain, DEFAULT_ENGINE_DOMAIN);
        assert_eq!(
            config.roster_debounce,
            Duration::from_millis(DEFAULT_ROSTER_DEBOUNCE_MS)
        );
        assert_eq!(
            config.roster_refresh,
            Duration::from_secs(DEFAULT_ROSTER_REFRESH_SECONDS)
        );
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert(
            "QUORUM_ENGINE_DOMAIN".to_string(),
            "meet.example.org".to_string(),
        );
        vars.insert("QUORUM_ROSTER_DEBOUNCE_MS".to_string(), "250".to_string());
        vars.insert(
            "QUORUM_ROSTER_REFRESH_SECONDS".to_string(),
            "10".to_string(),
        );
        vars.insert("QUORUM_EVENT_BUFFER".to_string(), "128".to_string());
        vars.insert("QUORUM_LOG_LEVEL".to_string(), "debug".to_string());
        vars.insert("QUORUM_LOG_JSON".to_string(), "true".to_string());

        let config = CoordinatorConfig::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.engine_domain, "meet.example.org");
        assert_eq!(config.roster_debounce, Duration::from_millis(250));
        assert_eq!(config.roster_refresh, Duration::from_secs(10));
        assert_eq!(config.event_buffer, 128);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_from_vars_missing_store_url() {
        let mut vars = base_vars();
        vars.remove("QUORUM_STORE_URL");

        let result = CoordinatorConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "QUORUM_STORE_URL"));
    }

    #[test]
    fn test_from_vars_missing_api_key() {
        let mut vars = base_vars();
        vars.remove("QUORUM_STORE_API_KEY");

        let result = CoordinatorConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "QUORUM_STORE_API_KEY")
        );
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let mut vars = base_vars();
        vars.insert("QUORUM_EVENT_BUFFER".to_string(), "0".to_string());

        let result = CoordinatorConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let vars = base_vars();
        let config = CoordinatorConfig::from_vars(&vars).expect("Config should load successfully");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("records.example.com"));
        assert!(!debug_output.contains("svc-key"));
    }
}
