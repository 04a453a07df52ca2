//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::GameSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable text
    pub log_json: bool,

    /// HS256 secret for bearer token verification
    pub token_secret: String,
    /// Allowed client origins for CORS, comma-separated
    pub client_origin: String,

    /// Directory holding one JSON record per player
    pub data_dir: PathBuf,
    /// Directory holding troops.json and towers.json
    pub catalog_dir: PathBuf,

    pub session_duration_secs: u64,
    pub event_interval_secs: u64,
    pub crit_chance: f64,
    pub finished_retention_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let crit_chance: f64 = parse_or(&lookup, "CRIT_CHANCE", 0.10)?;
        if !(0.0..=1.0).contains(&crit_chance) {
            return Err(ConfigError::Invalid("CRIT_CHANCE"));
        }

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => false,
            Some("json") => true,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json,

            token_secret: lookup("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?,
            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            data_dir: lookup("DATA_DIR")
                .unwrap_or_else(|| "data/players".to_string())
                .into(),
            catalog_dir: lookup("CATALOG_DIR")
                .unwrap_or_else(|| "data/catalog".to_string())
                .into(),

            session_duration_secs: parse_or(&lookup, "SESSION_DURATION_SECS", 180)?,
            event_interval_secs: parse_or(&lookup, "EVENT_INTERVAL_SECS", 30)?,
            crit_chance,
            finished_retention_secs: parse_or(&lookup, "FINISHED_RETENTION_SECS", 60)?,
        })
    }

    /// Game tunables derived from this configuration
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            duration: Duration::from_secs(self.session_duration_secs),
            critical_chance: self.crit_chance,
            // A zero period would make the event timer spin
            event_interval: Duration::from_secs(self.event_interval_secs.max(1)),
            finished_retention: Duration::from_secs(self.finished_retention_secs),
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("TOKEN_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("data/players"));

        let settings = config.game_settings();
        assert_eq!(settings.duration, Duration::from_secs(180));
        assert_eq!(settings.event_interval, Duration::from_secs(30));
        assert_eq!(settings.finished_retention, Duration::from_secs(60));
        assert!((settings.critical_chance - 0.10).abs() < f64::EPSILON);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[
            ("TOKEN_SECRET", "s"),
            ("PORT", "9000"),
            ("SERVER_ADDR", "127.0.0.1:1"),
        ])
        .unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn missing_secret_is_reported() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("TOKEN_SECRET"))));
    }

    #[test]
    fn malformed_numbers_are_reported_by_name() {
        let err = load(&[("TOKEN_SECRET", "s"), ("SESSION_DURATION_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("SESSION_DURATION_SECS")));

        let err = load(&[("TOKEN_SECRET", "s"), ("CRIT_CHANCE", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("CRIT_CHANCE")));
    }

    #[test]
    fn log_format_selects_json_output() {
        assert!(!load(&[("TOKEN_SECRET", "s")]).unwrap().log_json);
        assert!(load(&[("TOKEN_SECRET", "s"), ("LOG_FORMAT", "json")]).unwrap().log_json);

        let err = load(&[("TOKEN_SECRET", "s"), ("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("LOG_FORMAT")));
    }

    #[test]
    fn bad_address_is_rejected() {
        let err = load(&[("TOKEN_SECRET", "s"), ("SERVER_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress));
    }
}
