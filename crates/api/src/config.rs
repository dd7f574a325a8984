//! Application configuration loaded from environment variables.

use std::str::FromStr;

use application::CoreConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `SNAPSHOT_INTERVAL`, `UNDO_HISTORY_LIMIT`, `REGULATION_INNINGS`,
///   `MIN_BATTING_ORDER`: see [`CoreConfig`]
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub core: CoreConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    ///
    /// Values that fail to parse keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(value: Option<String>, default: T) -> T {
            value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        }

        let defaults = Self::default();
        let core = CoreConfig {
            snapshot_interval: parsed(
                lookup("SNAPSHOT_INTERVAL"),
                defaults.core.snapshot_interval,
            ),
            undo_history_limit: parsed(
                lookup("UNDO_HISTORY_LIMIT"),
                defaults.core.undo_history_limit,
            ),
            regulation_innings: parsed(
                lookup("REGULATION_INNINGS"),
                defaults.core.regulation_innings,
            ),
            min_batting_order: parsed(
                lookup("MIN_BATTING_ORDER"),
                defaults.core.min_batting_order,
            ),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            core,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
            core: CoreConfig::default(),
        }
    }
}
