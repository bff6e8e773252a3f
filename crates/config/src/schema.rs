use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "OAUTHKEEP_";

fn default_true() -> bool {
    true
}

fn default_database_url() -> String {
    "sqlite://oauthkeep.db?mode=rwc".to_string()
}
fn default_client_table() -> String {
    "oauth2_clients".to_string()
}
fn default_token_table() -> String {
    "oauth2_tokens".to_string()
}
fn default_gc_interval_secs() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Settings for the client table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTableConfig {
    /// Table name (defaults to `oauth2_clients`).
    #[serde(default = "default_client_table")]
    pub table: String,
    /// Create the table on startup when missing (defaults to `true`).
    #[serde(default = "default_true")]
    pub auto_create: bool,
}

impl Default for ClientTableConfig {
    fn default() -> Self {
        Self {
            table: default_client_table(),
            auto_create: true,
        }
    }
}

/// Expired-token sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// Run the background sweep (defaults to `true`).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweeps (defaults to 600).
    #[serde(default = "default_gc_interval_secs")]
    pub interval_secs: u64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_gc_interval_secs(),
        }
    }
}

impl GcConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Settings for the token table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTableConfig {
    /// Table name (defaults to `oauth2_tokens`).
    #[serde(default = "default_token_table")]
    pub table: String,
    /// Create the table on startup when missing (defaults to `true`).
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default)]
    pub gc: GcConfig,
}

impl Default for TokenTableConfig {
    fn default() -> Self {
        Self {
            table: default_token_table(),
            auto_create: true,
            gc: GcConfig::default(),
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL understood by sea-orm.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub clients: ClientTableConfig,
    #[serde(default)]
    pub tokens: TokenTableConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            clients: ClientTableConfig::default(),
            tokens: TokenTableConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Loads configuration from defaults and the environment only.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if an environment override has the wrong type.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Self::env())
            .extract()
    }

    /// Parses configuration from a YAML string, merged with defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .merge(Self::env())
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Self::env())
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
database_url: "postgres://oauth:pw@localhost/oauth"
clients:
  table: apps
tokens:
  table: grants
  auto_create: false
  gc:
    enabled: false
    interval_secs: 30
log:
  level: debug
  json: true
"#;

    // Loaders read the process environment, so every test that calls one runs
    // inside a `Jail` to serialize against the env-override test.
    fn jailed(f: impl FnOnce(&mut figment::Jail) -> figment::error::Result<()>) {
        figment::Jail::expect_with(f);
    }

    #[test]
    fn test_default_config() {
        let c = Config::default();
        assert_eq!(c.database_url, "sqlite://oauthkeep.db?mode=rwc");
        assert_eq!(c.clients.table, "oauth2_clients");
        assert_eq!(c.tokens.table, "oauth2_tokens");
        assert!(c.clients.auto_create);
        assert!(c.tokens.gc.enabled);
        assert_eq!(c.tokens.gc.interval(), Duration::from_secs(600));
        assert_eq!(c.log.level, "info");
    }

    #[test]
    fn test_from_yaml_tables() {
        jailed(|_| {
            let c = Config::from_yaml(SAMPLE_YAML)?;
            assert_eq!(c.database_url, "postgres://oauth:pw@localhost/oauth");
            assert_eq!(c.clients.table, "apps");
            assert!(c.clients.auto_create); // default preserved
            assert_eq!(c.tokens.table, "grants");
            assert!(!c.tokens.auto_create);
            Ok(())
        });
    }

    #[test]
    fn test_from_yaml_gc_and_log() {
        jailed(|_| {
            let c = Config::from_yaml(SAMPLE_YAML)?;
            assert!(!c.tokens.gc.enabled);
            assert_eq!(c.tokens.gc.interval(), Duration::from_secs(30));
            assert_eq!(c.log.level, "debug");
            assert!(c.log.json);
            Ok(())
        });
    }

    #[test]
    fn test_from_yaml_defaults_applied() {
        jailed(|_| {
            let c = Config::from_yaml("tokens:\n  gc:\n    interval_secs: 5\n")?;
            assert_eq!(c.tokens.gc.interval_secs, 5);
            assert!(c.tokens.gc.enabled);
            assert_eq!(c.tokens.table, "oauth2_tokens");
            Ok(())
        });
    }

    #[test]
    fn test_from_yaml_invalid() {
        jailed(|_| {
            assert!(Config::from_yaml("tokens:\n  gc:\n    interval_secs: soon\n").is_err());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        jailed(|jail| {
            jail.set_env("OAUTHKEEP_TOKENS__GC__INTERVAL_SECS", "42");
            jail.set_env("OAUTHKEEP_DATABASE_URL", "sqlite::memory:");
            let c = Config::from_yaml(SAMPLE_YAML)?;
            assert_eq!(c.tokens.gc.interval_secs, 42);
            assert_eq!(c.database_url, "sqlite::memory:");
            Ok(())
        });
    }

    #[test]
    fn test_from_env_only() {
        jailed(|jail| {
            jail.set_env("OAUTHKEEP_CLIENTS__AUTO_CREATE", "false");
            let c = Config::from_env()?;
            assert!(!c.clients.auto_create);
            assert_eq!(c.clients.table, "oauth2_clients");
            Ok(())
        });
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauthkeep.yaml");
        std::fs::write(&path, "clients:\n  table: from_file\n").unwrap();
        jailed(|_| {
            let c = Config::from_file(&path)?;
            assert_eq!(c.clients.table, "from_file");
            assert_eq!(c.tokens.table, "oauth2_tokens");
            Ok(())
        });
    }
}
