//! The monitor configuration record.
//!
//! Resolution order: compiled defaults, then an optional JSON file, then
//! `NETMON_*` environment overrides. Invalid environment values are
//! silently ignored and fall back to the file or default value.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Configuration passed once to the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Upstream STOMP endpoint host, also the `host` header value.
    pub network_events_url: String,
    pub network_events_port: u16,
    pub network_events_username: String,
    pub network_events_password: String,
    /// TLS trust store for the upstream transport. Validated for
    /// existence when set.
    pub ca_cert_file: Option<PathBuf>,
    /// Path or `https://` URL of the network-layout JSON document.
    pub network_layout_file: Option<String>,
    /// Advertised hostname of the quiet-route service.
    pub quiet_route_hostname: String,
    /// Bind address of the quiet-route listener.
    pub quiet_route_ip: String,
    pub quiet_route_port: u16,
    pub quiet_route_max_slowdown_pc: f64,
    pub quiet_route_min_quietness_pc: f64,
    pub quiet_route_max_n_paths: usize,
    /// Destination carrying passenger events on the upstream session.
    pub passenger_events_destination: String,
    /// Destination quiet-route requests arrive on.
    pub quiet_route_destination: String,
    /// Destination quiet-route responses are delivered on.
    pub quiet_route_response_destination: String,
    /// Minutes added per route change in pathfinding.
    pub route_change_penalty: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            network_events_url: "ltnm.learncppthroughprojects.com".into(),
            network_events_port: 443,
            network_events_username: String::new(),
            network_events_password: String::new(),
            ca_cert_file: None,
            network_layout_file: None,
            quiet_route_hostname: "localhost".into(),
            quiet_route_ip: "127.0.0.1".into(),
            quiet_route_port: 8042,
            quiet_route_max_slowdown_pc: 0.10,
            quiet_route_min_quietness_pc: 0.10,
            quiet_route_max_n_paths: 20,
            passenger_events_destination: "/passengers".into(),
            quiet_route_destination: "/quiet-route".into(),
            quiet_route_response_destination: "/quiet-route-response".into(),
            route_change_penalty: 5,
        }
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse the configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MonitorConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                debug!(?path, "loading configuration file");
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `NETMON_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_string("NETMON_NETWORK_EVENTS_URL") {
            self.network_events_url = v;
        }
        if let Some(v) = read_env_u16("NETMON_NETWORK_EVENTS_PORT") {
            self.network_events_port = v;
        }
        if let Some(v) = read_env_string("NETMON_NETWORK_EVENTS_USERNAME") {
            self.network_events_username = v;
        }
        if let Some(v) = read_env_string("NETMON_NETWORK_EVENTS_PASSWORD") {
            self.network_events_password = v;
        }
        if let Some(v) = read_env_string("NETMON_CA_CERT_FILE") {
            self.ca_cert_file = Some(PathBuf::from(v));
        }
        if let Some(v) = read_env_string("NETMON_NETWORK_LAYOUT_FILE") {
            self.network_layout_file = Some(v);
        }
        if let Some(v) = read_env_string("NETMON_QUIET_ROUTE_HOSTNAME") {
            self.quiet_route_hostname = v;
        }
        if let Some(v) = read_env_string("NETMON_QUIET_ROUTE_IP") {
            self.quiet_route_ip = v;
        }
        if let Some(v) = read_env_u16("NETMON_QUIET_ROUTE_PORT") {
            self.quiet_route_port = v;
        }
        if let Some(v) = read_env_f64("NETMON_QUIET_ROUTE_MAX_SLOWDOWN_PC") {
            self.quiet_route_max_slowdown_pc = v;
        }
        if let Some(v) = read_env_f64("NETMON_QUIET_ROUTE_MIN_QUIETNESS_PC") {
            self.quiet_route_min_quietness_pc = v;
        }
        if let Some(v) = read_env_usize("NETMON_QUIET_ROUTE_MAX_N_PATHS") {
            self.quiet_route_max_n_paths = v;
        }
        if let Some(v) = read_env_u32("NETMON_ROUTE_CHANGE_PENALTY") {
            self.route_change_penalty = v;
        }
    }
}

fn read_env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(key: &str) -> Option<u16> {
    read_env_string(key)?.parse().ok()
}

fn read_env_u32(key: &str) -> Option<u32> {
    read_env_string(key)?.parse().ok()
}

fn read_env_usize(key: &str) -> Option<usize> {
    read_env_string(key)?.parse().ok()
}

fn read_env_f64(key: &str) -> Option<f64> {
    read_env_string(key)?.parse().ok().filter(|v: &f64| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.quiet_route_max_slowdown_pc, 0.10);
        assert_eq!(config.quiet_route_min_quietness_pc, 0.10);
        assert_eq!(config.quiet_route_max_n_paths, 20);
        assert_eq!(config.route_change_penalty, 5);
        assert_eq!(config.passenger_events_destination, "/passengers");
    }

    #[test]
    fn serde_roundtrip() {
        let config = MonitorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: MonitorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.network_events_url, config.network_events_url);
        assert_eq!(back.quiet_route_port, config.quiet_route_port);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"network_events_url": "broker.test", "quiet_route_port": 9000}}"#
        )
        .unwrap();
        let config = MonitorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.network_events_url, "broker.test");
        assert_eq!(config.quiet_route_port, 9000);
        assert_eq!(config.quiet_route_max_n_paths, 20);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = MonitorConfig::load(Some(Path::new("/nonexistent/netmon.json")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = MonitorConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // The env tests use keys no other test reads, so parallel test
    // execution cannot observe a half-set environment.
    #[test]
    fn env_overrides_take_precedence() {
        std::env::set_var("NETMON_QUIET_ROUTE_HOSTNAME", "quiet.test");
        std::env::set_var("NETMON_NETWORK_EVENTS_USERNAME", "operator");
        let mut config = MonitorConfig::default();
        config.apply_env_overrides();
        std::env::remove_var("NETMON_QUIET_ROUTE_HOSTNAME");
        std::env::remove_var("NETMON_NETWORK_EVENTS_USERNAME");
        assert_eq!(config.quiet_route_hostname, "quiet.test");
        assert_eq!(config.network_events_username, "operator");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        std::env::set_var("NETMON_QUIET_ROUTE_MAX_N_PATHS", "plenty");
        let mut config = MonitorConfig::default();
        config.apply_env_overrides();
        std::env::remove_var("NETMON_QUIET_ROUTE_MAX_N_PATHS");
        assert_eq!(config.quiet_route_max_n_paths, 20);
    }
}
