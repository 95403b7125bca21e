//! Configuration management
//!
//! Configuration is read from a `config.yml` file and can be overridden with
//! `NOTEBOARD_*` environment variables. Every field is optional; missing
//! values fall back to defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// News listing configuration
    #[serde(default)]
    pub news: NewsConfig,
    /// Comment moderation configuration
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/noteboard.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a login session in days
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_session_ttl_days() -> i64 {
    7
}

/// Upper bound for `session.ttl_days`, about ten years
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// News listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Number of news items shown on the news home page
    #[serde(default = "default_home_page_count")]
    pub home_page_count: i64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            home_page_count: default_home_page_count(),
        }
    }
}

fn default_home_page_count() -> i64 {
    10
}

/// Comment moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Substrings that cause a comment to be rejected
    #[serde(default = "default_banned_words")]
    pub banned_words: Vec<String>,
    /// Whether matching respects letter case
    #[serde(default)]
    pub case_sensitive: bool,
    /// Message attached to the comment text field on rejection
    #[serde(default = "default_warning")]
    pub warning: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            banned_words: default_banned_words(),
            case_sensitive: false,
            warning: default_warning(),
        }
    }
}

fn default_banned_words() -> Vec<String> {
    vec!["редиска".to_string(), "негодяй".to_string()]
}

fn default_warning() -> String {
    "Не ругайтесь!".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. A file that
    /// exists but is not valid YAML is an error carrying the location.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&self.session.ttl_days) {
            return Err(ConfigError::Invalid {
                field: "session.ttl_days",
                message: format!(
                    "must be between 1 and {}, got {}",
                    MAX_SESSION_TTL_DAYS, self.session.ttl_days
                ),
            });
        }
        if self.news.home_page_count < 1 {
            return Err(ConfigError::Invalid {
                field: "news.home_page_count",
                message: format!("must be at least 1, got {}", self.news.home_page_count),
            });
        }
        Ok(())
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// Recognised variables:
    /// - NOTEBOARD_SERVER_HOST
    /// - NOTEBOARD_SERVER_PORT
    /// - NOTEBOARD_DATABASE_DRIVER
    /// - NOTEBOARD_DATABASE_URL
    /// - NOTEBOARD_SESSION_TTL_DAYS
    /// - NOTEBOARD_NEWS_HOME_PAGE_COUNT
    /// - NOTEBOARD_MODERATION_BANNED_WORDS (comma separated)
    /// - NOTEBOARD_MODERATION_CASE_SENSITIVE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NOTEBOARD_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NOTEBOARD_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("NOTEBOARD_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("NOTEBOARD_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("NOTEBOARD_SESSION_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if (1..=MAX_SESSION_TTL_DAYS).contains(&ttl) {
                    self.session.ttl_days = ttl;
                }
            }
        }

        if let Ok(count) = std::env::var("NOTEBOARD_NEWS_HOME_PAGE_COUNT") {
            if let Ok(count) = count.parse::<i64>() {
                if count > 0 {
                    self.news.home_page_count = count;
                }
            }
        }

        if let Ok(words) = std::env::var("NOTEBOARD_MODERATION_BANNED_WORDS") {
            self.moderation.banned_words = words
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(flag) = std::env::var("NOTEBOARD_MODERATION_CASE_SENSITIVE") {
            match flag.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.moderation.case_sensitive = true,
                "false" | "0" | "no" => self.moderation.case_sensitive = false,
                _ => {}
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches NOTEBOARD_* variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
