//! Configuration management
//!
//! Settings are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. a settings file, either `settings.json` in the data directory or an
//!    explicit `--config` path (`.json` or a `KEY=VALUE` `.env` file)
//! 3. the process environment
//!
//! ```json
//! {
//!   "env": "prod",
//!   "server": { "port": 8080, "requestTimeout": "5s" },
//!   "database": { "url": "wallets.duckdb", "maxOpenConns": 25 },
//!   "retry": { "maxAttempts": 5, "baseDelay": "10ms" }
//! }
//! ```
//!
//! The resulting [`Config`] is built once at startup and never mutated.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::result::{Error, Result};
use crate::services::mutation::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};

pub const DEFAULT_DATABASE_FILE: &str = "wallets.duckdb";
pub const IN_MEMORY: &str = ":memory:";

/// Deployment environment, which selects log format and verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::config(format!("unknown environment: {other:?}"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Local => "local",
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        })
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    env: Option<String>,
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(default)]
    retry: RetrySettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    host: Option<String>,
    port: Option<u16>,
    request_timeout: Option<String>,
    shutdown_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    url: Option<String>,
    max_open_conns: Option<usize>,
    max_idle_conns: Option<usize>,
    max_lifetime: Option<String>,
    acquire_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrySettings {
    max_attempts: Option<u32>,
    base_delay: Option<String>,
    max_delay: Option<String>,
    retry_store_errors: Option<bool>,
}

impl SettingsFile {
    /// Flatten into the same keys the environment uses
    fn into_values(self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                values.insert(key.to_string(), v);
            }
        };

        put("ENV", self.env);
        put("SERVER_HOST", self.server.host);
        put("SERVER_PORT", self.server.port.map(|p| p.to_string()));
        put("REQUEST_TIMEOUT", self.server.request_timeout);
        put("SHUTDOWN_TIMEOUT", self.server.shutdown_timeout);
        put("DATABASE_URL", self.database.url);
        put("MAX_OPEN_CONNS", self.database.max_open_conns.map(|n| n.to_string()));
        put("MAX_IDLE_CONNS", self.database.max_idle_conns.map(|n| n.to_string()));
        put("MAX_LIFETIME", self.database.max_lifetime);
        put("ACQUIRE_TIMEOUT", self.database.acquire_timeout);
        put("RETRY_MAX_ATTEMPTS", self.retry.max_attempts.map(|n| n.to_string()));
        put("RETRY_BASE_DELAY", self.retry.base_delay);
        put("RETRY_MAX_DELAY", self.retry.max_delay);
        put("RETRY_STORE_ERRORS", self.retry.retry_store_errors.map(|b| b.to_string()));
        values
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline applied to every request's store work
    pub request_timeout: Duration,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the wallet database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseLocation::InMemory => f.write_str(IN_MEMORY),
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Store and connection pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    pub max_open_conns: usize,
    pub max_idle_conns: usize,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

/// Mutation retry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retry_store_errors: bool,
}

/// Wallet service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub env: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub retry: RetryConfig,
}

/// In-memory settings for tests and embedders that build a [`Config`] by hand.
///
/// [`Config::load`] starts from these values but places the database at
/// `<data_dir>/wallets.duckdb` unless `DATABASE_URL` says otherwise.
impl Default for Config {
    fn default() -> Self {
        Self {
            env: Environment::Local,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout: Duration::from_secs(5),
                shutdown_timeout: Duration::from_secs(30),
            },
            database: DatabaseConfig {
                location: DatabaseLocation::InMemory,
                max_open_conns: 25,
                max_idle_conns: 25,
                max_lifetime: Duration::from_secs(300),
                acquire_timeout: Duration::from_secs(5),
            },
            retry: RetryConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                base_delay: DEFAULT_BASE_DELAY,
                max_delay: DEFAULT_MAX_DELAY,
                retry_store_errors: true,
            },
        }
    }
}

impl Config {
    /// Load config for a data directory.
    ///
    /// `config_path` wins over `<data_dir>/settings.json`; a missing default
    /// settings file is fine, a missing explicit one is an error.
    pub fn load(data_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let file_values = match config_path {
            Some(path) => read_settings(path)?,
            None => {
                let default_path = data_dir.join("settings.json");
                if default_path.exists() {
                    read_settings(&default_path)?
                } else {
                    HashMap::new()
                }
            }
        };

        Self::from_sources(data_dir, &file_values, |key| std::env::var(key).ok())
    }

    /// Build config from file values plus an environment lookup.
    ///
    /// The lookup takes precedence over the file.
    pub fn from_sources(
        data_dir: &Path,
        file_values: &HashMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let get = |key: &str| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_values.get(key).cloned())
        };
        let defaults = Config::default();

        let env_name = match get("ENV") {
            Some(raw) => raw.parse()?,
            None => defaults.env,
        };

        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or(defaults.server.host),
            port: parse_or("SERVER_PORT", get("SERVER_PORT"), defaults.server.port)?,
            request_timeout: duration_or(
                "REQUEST_TIMEOUT",
                get("REQUEST_TIMEOUT"),
                defaults.server.request_timeout,
            )?,
            shutdown_timeout: duration_or(
                "SHUTDOWN_TIMEOUT",
                get("SHUTDOWN_TIMEOUT"),
                defaults.server.shutdown_timeout,
            )?,
        };

        let location = match get("DATABASE_URL") {
            Some(url) if url.trim() == IN_MEMORY => DatabaseLocation::InMemory,
            Some(url) => DatabaseLocation::File(resolve_path(data_dir, url.trim())),
            None => DatabaseLocation::File(data_dir.join(DEFAULT_DATABASE_FILE)),
        };

        let max_open_conns = parse_or(
            "MAX_OPEN_CONNS",
            get("MAX_OPEN_CONNS"),
            defaults.database.max_open_conns,
        )?;
        if max_open_conns == 0 {
            return Err(Error::config("MAX_OPEN_CONNS must be at least 1"));
        }
        let max_idle_conns = parse_or(
            "MAX_IDLE_CONNS",
            get("MAX_IDLE_CONNS"),
            defaults.database.max_idle_conns,
        )?
        .min(max_open_conns);

        let database = DatabaseConfig {
            location,
            max_open_conns,
            max_idle_conns,
            max_lifetime: duration_or(
                "MAX_LIFETIME",
                get("MAX_LIFETIME"),
                defaults.database.max_lifetime,
            )?,
            acquire_timeout: duration_or(
                "ACQUIRE_TIMEOUT",
                get("ACQUIRE_TIMEOUT"),
                defaults.database.acquire_timeout,
            )?,
        };

        let max_attempts = parse_or(
            "RETRY_MAX_ATTEMPTS",
            get("RETRY_MAX_ATTEMPTS"),
            defaults.retry.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(Error::config("RETRY_MAX_ATTEMPTS must be at least 1"));
        }

        let retry = RetryConfig {
            max_attempts,
            base_delay: duration_or(
                "RETRY_BASE_DELAY",
                get("RETRY_BASE_DELAY"),
                defaults.retry.base_delay,
            )?,
            max_delay: duration_or(
                "RETRY_MAX_DELAY",
                get("RETRY_MAX_DELAY"),
                defaults.retry.max_delay,
            )?,
            retry_store_errors: match get("RETRY_STORE_ERRORS") {
                Some(raw) => parse_bool("RETRY_STORE_ERRORS", &raw)?,
                None => defaults.retry.retry_store_errors,
            },
        };

        Ok(Self {
            env: env_name,
            server,
            database,
            retry,
        })
    }
}

/// Read a settings file into flat `KEY -> value` pairs
fn read_settings(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Err(Error::config(format!(
            "config file does not exist: {}",
            path.display()
        )));
    }

    let is_env_file = path.file_name().is_some_and(|n| n == ".env")
        || path.extension().is_some_and(|e| e == "env");
    let is_json_file = path.extension().is_some_and(|e| e == "json");

    if is_env_file {
        parse_env_file(path)
    } else if is_json_file {
        let content = std::fs::read_to_string(path)?;
        let settings: SettingsFile = serde_json::from_str(&content)?;
        Ok(settings.into_values())
    } else {
        Err(Error::config(format!(
            "unsupported config file format: {}",
            path.display()
        )))
    }
}

/// Read a dotenv file into a map. The process environment is left untouched;
/// layering against it happens in [`Config::from_sources`].
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let invalid = |e: dotenvy::Error| {
        Error::config(format!("invalid env file {}: {e}", path.display()))
    };

    dotenvy::from_path_iter(path)
        .map_err(invalid)?
        .map(|item| item.map_err(invalid))
        .collect()
}

/// Parse `"300s"`, `"10ms"`, `"2m"` or a bare number of seconds
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => raw.split_at(i),
        None => (raw, "s"),
    };
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        _ => None,
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" | "1" | "yes" | "TRUE" | "YES" => Ok(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Ok(false),
        _ => Err(Error::config(format!("invalid value for {key}: {raw:?}"))),
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("invalid value for {key}: {raw:?}"))),
        None => Ok(default),
    }
}

fn duration_or(key: &str, raw: Option<String>, default: Duration) -> Result<Duration> {
    match raw {
        Some(raw) => parse_duration(&raw)
            .ok_or_else(|| Error::config(format!("invalid duration for {key}: {raw:?}"))),
        None => Ok(default),
    }
}

fn resolve_path(data_dir: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        data_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let dir = Path::new("/var/lib/walletd");
        let config = Config::from_sources(dir, &HashMap::new(), no_env).unwrap();

        assert_eq!(config.env, Environment::Local);
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.database.location,
            DatabaseLocation::File(dir.join(DEFAULT_DATABASE_FILE))
        );
        assert_eq!(config.database.max_open_conns, 25);
        assert_eq!(config.database.max_lifetime, Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
        assert!(config.retry.retry_store_errors);
    }

    #[test]
    fn test_default_is_in_memory_but_loaded_is_file() {
        assert_eq!(Config::default().database.location, DatabaseLocation::InMemory);

        let dir = tempdir().unwrap();
        let loaded = Config::from_sources(dir.path(), &HashMap::new(), no_env).unwrap();
        assert_eq!(
            loaded.database.location,
            DatabaseLocation::File(dir.path().join(DEFAULT_DATABASE_FILE))
        );
        assert_eq!(loaded.database.max_open_conns, Config::default().database.max_open_conns);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = HashMap::new();
        file.insert("SERVER_PORT".to_string(), "9000".to_string());
        file.insert("ENV".to_string(), "dev".to_string());

        let env = |key: &str| match key {
            "SERVER_PORT" => Some("9100".to_string()),
            "DATABASE_URL" => Some(":memory:".to_string()),
            _ => None,
        };
        let config = Config::from_sources(Path::new("."), &file, env).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.env, Environment::Dev);
        assert_eq!(config.database.location, DatabaseLocation::InMemory);
    }

    #[test]
    fn test_idle_clamped_to_open() {
        let env = |key: &str| match key {
            "MAX_OPEN_CONNS" => Some("4".to_string()),
            "MAX_IDLE_CONNS" => Some("10".to_string()),
            _ => None,
        };
        let config = Config::from_sources(Path::new("."), &HashMap::new(), env).unwrap();
        assert_eq!(config.database.max_idle_conns, 4);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_attempts = |key: &str| (key == "RETRY_MAX_ATTEMPTS").then(|| "0".to_string());
        assert!(matches!(
            Config::from_sources(Path::new("."), &HashMap::new(), zero_attempts),
            Err(Error::Config(_))
        ));

        let bad_port = |key: &str| (key == "SERVER_PORT").then(|| "eighty".to_string());
        assert!(Config::from_sources(Path::new("."), &HashMap::new(), bad_port).is_err());

        let bad_env = |key: &str| (key == "ENV").then(|| "staging".to_string());
        assert!(Config::from_sources(Path::new("."), &HashMap::new(), bad_env).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("300s"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("10ms"), Some(Duration::from_millis(10)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("10h"), None);
    }

    #[test]
    fn test_parse_env_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# wallet service\nENV=prod\n\nDATABASE_URL=\"/data/wallets.duckdb\"\n",
        )
        .unwrap();

        let values = parse_env_file(&path).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["ENV"], "prod");
        assert_eq!(values["DATABASE_URL"], "/data/wallets.duckdb");

        std::fs::write(&path, "ENV=prod\nGARBAGE\n").unwrap();
        assert!(matches!(parse_env_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_file_quotes_and_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("walletd.env");
        std::fs::write(
            &path,
            "export SERVER_PORT=9000\n\
             REQUEST_TIMEOUT='2s'\n\
             DATABASE_URL=\"my wallets.duckdb\"\n",
        )
        .unwrap();

        let values = parse_env_file(&path).unwrap();
        assert_eq!(values["SERVER_PORT"], "9000");
        assert_eq!(values["REQUEST_TIMEOUT"], "2s");
        assert_eq!(values["DATABASE_URL"], "my wallets.duckdb");

        // Reading a file does not leak into the process environment
        assert!(std::env::var("REQUEST_TIMEOUT").is_err());

        let config = Config::from_sources(dir.path(), &values, no_env).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout, Duration::from_secs(2));
        assert_eq!(
            config.database.location,
            DatabaseLocation::File(dir.path().join("my wallets.duckdb"))
        );
    }

    #[test]
    fn test_load_dotenv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "MAX_LIFETIME=60s\nDATABASE_URL=custom.duckdb\n").unwrap();

        let values = read_settings(&path).unwrap();
        let config = Config::from_sources(dir.path(), &values, no_env).unwrap();
        assert_eq!(config.database.max_lifetime, Duration::from_secs(60));
        assert_eq!(
            config.database.location,
            DatabaseLocation::File(dir.path().join("custom.duckdb"))
        );
    }

    #[test]
    fn test_load_json_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"env":"prod","server":{"port":7000},"retry":{"maxAttempts":3,"baseDelay":"5ms"}}"#,
        )
        .unwrap();

        let values = read_settings(&path).unwrap();
        let config = Config::from_sources(dir.path(), &values, no_env).unwrap();
        assert_eq!(config.env, Environment::Prod);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_unsupported_or_missing_file() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("settings.yaml");
        std::fs::write(&yaml, "env: prod").unwrap();
        assert!(matches!(read_settings(&yaml), Err(Error::Config(_))));

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            Config::load(dir.path(), Some(&missing)),
            Err(Error::Config(_))
        ));
    }
}
