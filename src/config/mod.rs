//! Configuration
//!
//! Layered configuration for the relay: built-in defaults, an optional TOML
//! file (`~/.whatsapp-relay/config.toml` unless a path is given), then
//! `WA_RELAY__SECTION__KEY` environment variables. CLI flags are applied on
//! top of the loaded value by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Port used when no usable port was configured.
pub const DEFAULT_PORT: u16 = 2408;

/// Prefix for environment overrides, e.g. `WA_RELAY__SERVER__PORT=3000`.
pub const ENV_PREFIX: &str = "WA_RELAY";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a `/send-message` request body, attachment included.
    pub max_upload_bytes: usize,
    /// Allow cross-origin requests from any origin.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: 16 * 1024 * 1024,
            cors: true,
        }
    }
}

/// Toggles for the send pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Ask the session whether the number exists before sending.
    pub check_registration: bool,
    /// Reject sends with 503 until the session reports ready.
    pub require_ready: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            check_registration: true,
            require_ready: true,
        }
    }
}

/// Event log and diagnostic tracing output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append every dispatch and session event to `event_log`.
    pub persist_events: bool,
    pub event_log: PathBuf,
    /// Default level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit diagnostic output to stderr as JSON.
    pub json: bool,
    /// Optional file that also receives diagnostic output.
    pub diagnostics_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            persist_events: true,
            event_log: PathBuf::from("envios.log"),
            level: "info".to_string(),
            json: false,
            diagnostics_file: None,
        }
    }
}

/// WhatsApp REST gateway the session client talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_url: String,
    pub api_key: String,
    /// Gateway instance that owns the WhatsApp session.
    pub instance: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_string(),
            api_key: String::new(),
            instance: "relay".to_string(),
            poll_interval_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

/// Base directory for relay state: `~/.whatsapp-relay`
pub fn relay_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".whatsapp-relay")
}

/// Config file read when no explicit path is given
pub fn default_config_path() -> PathBuf {
    relay_home().join("config.toml")
}

impl Config {
    /// Load configuration. An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::from(default_config_path()).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        tracing::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }
}

/// Resolve a raw port value the way the operator prompt does: the leading
/// digits are read (`"3000abc"` is 3000). No leading digits, zero or a value
/// above 65535 falls back to [`DEFAULT_PORT`].
pub fn resolve_port(raw: &str) -> u16 {
    let raw = raw.trim_start();
    let digits = raw
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw, |end| &raw[..end]);

    match digits.parse::<u16>() {
        Ok(0) | Err(_) => DEFAULT_PORT,
        Ok(port) => port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.dispatch.check_registration);
        assert!(config.dispatch.require_ready);
        assert!(config.logging.persist_events);
        assert_eq!(config.logging.event_log, PathBuf::from("envios.log"));
    }

    #[rstest]
    #[case("", DEFAULT_PORT)]
    #[case("   ", DEFAULT_PORT)]
    #[case("abc", DEFAULT_PORT)]
    #[case("0", DEFAULT_PORT)]
    #[case("70000", DEFAULT_PORT)]
    #[case("3000", 3000)]
    #[case(" 8081\n", 8081)]
    #[case("3000abc", 3000)]
    #[case("3000.5", 3000)]
    #[case("abc3000", DEFAULT_PORT)]
    #[case("-3000", DEFAULT_PORT)]
    fn test_resolve_port(#[case] raw: &str, #[case] expected: u16) {
        assert_eq!(resolve_port(raw), expected);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 3100

[dispatch]
check_registration = false

[gateway]
api_url = "http://gateway.local:9000"
instance = "sales"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 3100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.dispatch.check_registration);
        assert!(config.dispatch.require_ready);
        assert_eq!(config.gateway.api_url, "http://gateway.local:9000");
        assert_eq!(config.gateway.instance, "sales");
        assert_eq!(config.gateway.poll_interval_secs, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
