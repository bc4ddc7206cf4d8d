//! Environment-driven configuration.
//!
//! All settings come from environment variables; `.env` is loaded in
//! development before this module reads anything.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidEnvVar {
        /// The variable name.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Deployment environment, switching log format among other things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Whether this is a production deployment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("invalid environment: {s}")),
        }
    }
}

/// Locations of the two remote backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Auth backend base URL (user records, credentials).
    pub auth_url: Url,
    /// Chat backend base URL (models, inference).
    pub chat_url: Url,
    /// API path prefix, e.g. `v0`.
    pub api_version: String,
}

/// Complete configuration for the web process.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// Backend locations.
    pub backend: BackendConfig,
    /// Whether the admin screen may hard-delete user rows.
    pub allow_hard_delete: bool,
    /// Optional flat-file user store for early testing. When set, logins
    /// are verified locally instead of against the auth backend.
    pub prototype_db_path: Option<PathBuf>,
}

impl WebConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing or cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = get_env_or_default("CAREBOT_HOST", "127.0.0.1");
        let port = parse_env_or_default("CAREBOT_PORT", 3000)?;

        let environment = match get_optional_env("ENVIRONMENT") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidEnvVar {
                key: "ENVIRONMENT".to_owned(),
                message,
            })?,
            None => Environment::default(),
        };

        let backend = BackendConfig {
            auth_url: parse_url_env("AUTH_BACKEND_URL", "http://localhost:7030")?,
            chat_url: parse_url_env("CHAT_BACKEND_URL", "http://localhost:8030")?,
            api_version: get_env_or_default("API_VERSION", "v0"),
        };

        let allow_hard_delete = match get_optional_env("ALLOW_HARD_DELETE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                key: "ALLOW_HARD_DELETE".to_owned(),
                message: format!("expected true/false, got: {raw}"),
            })?,
            None => false,
        };

        let prototype_db_path = get_optional_env("PROTOTYPE_DB_PATH").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            environment,
            backend,
            allow_hard_delete,
            prototype_db_path,
        })
    }

    /// The socket address string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset or empty.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable; empty counts as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable, or a default when unset.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_owned())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
            key: key.to_owned(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_url_env(key: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = get_env_or_default(key, default);
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar {
        key: key.to_owned(),
        message: format!("{e}: {raw}"),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_get_required_env_missing() {
        let result = get_required_env("CAREBOT_TEST_DOES_NOT_EXIST");
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_get_env_or_default() {
        assert_eq!(
            get_env_or_default("CAREBOT_TEST_DOES_NOT_EXIST", "fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_bind_addr() {
        let config = WebConfig {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            environment: Environment::Development,
            backend: BackendConfig {
                auth_url: Url::parse("http://localhost:7030").unwrap(),
                chat_url: Url::parse("http://localhost:8030").unwrap(),
                api_version: "v0".to_owned(),
            },
            allow_hard_delete: false,
            prototype_db_path: None,
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
