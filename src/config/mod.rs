use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::query::literal;
use crate::query::CacheScope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
    /// Server-side `statement_timeout` for pooled connections; 0 leaves it off
    #[serde(default)]
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// Scope applied to read queries when caching is enabled
    pub scope: CacheScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// HS256 secret for bearer tokens; empty disables token authentication
    pub jwt_secret: String,
    /// Role for requests without credentials
    pub anonymous_role: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::preset(Environment::from_env()).with_env_overrides()
    }

    /// Preset for `APP_ENV` (or the given file), then env overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::preset(Environment::from_env()),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// YAML or JSON (JSON parses as YAML)
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }
        if let Some(v) = var("DATABASE_ENABLE_SLOW_QUERY_WARNING") {
            self.database.enable_slow_query_warning = v.parse().unwrap_or(self.database.enable_slow_query_warning);
        }
        if let Some(v) = var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }
        if let Some(v) = var("DATABASE_STATEMENT_TIMEOUT_MS") {
            self.database.statement_timeout_ms = v.parse().unwrap_or(self.database.statement_timeout_ms);
        }

        // Cache overrides
        if let Some(v) = var("CACHE_ENABLED") {
            self.cache.enabled = v.parse().unwrap_or(self.cache.enabled);
        }
        if let Some(v) = var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }
        if let Some(v) = var("CACHE_SCOPE") {
            self.cache.scope = v.parse().unwrap_or(self.cache.scope);
        }

        // API overrides
        if let Some(v) = var("API_PORT").or_else(|| var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = var("API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Some(v) = var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Some(v) = var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(v) = var("SECURITY_JWT_SECRET").or_else(|| var("JWT_SECRET")) {
            self.security.jwt_secret = v;
        }
        if let Some(v) = var("SECURITY_ANONYMOUS_ROLE") {
            self.security.anonymous_role = v;
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache.ttl_secs must be positive when caching is enabled".into()));
        }
        let role = &self.security.anonymous_role;
        if !role.is_empty() && !literal::is_identifier(role) {
            return Err(ConfigError::Invalid(format!("security.anonymous_role is not a valid role name: {:?}", role)));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "postgres://server@localhost:5432/postgres".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
                statement_timeout_ms: 0,
            },
            cache: CacheConfig {
                enabled: false,
                ttl_secs: 60,
                scope: CacheScope::PostUserScoping,
            },
            api: ApiConfig {
                port: 8080,
                request_timeout_secs: 60,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                anonymous_role: "anon".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 500,
                statement_timeout_ms: 30000,
            },
            cache: CacheConfig {
                enabled: true,
                ttl_secs: 60,
                scope: CacheScope::PostUserScoping,
            },
            api: ApiConfig {
                port: 8080,
                request_timeout_secs: 30,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                anonymous_role: "anon".to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 1000,
                statement_timeout_ms: 15000,
            },
            cache: CacheConfig {
                enabled: true,
                ttl_secs: 60,
                scope: CacheScope::PostUserScoping,
            },
            api: ApiConfig {
                port: 8080,
                request_timeout_secs: 15,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                anonymous_role: "anon".to_string(),
            },
        }
    }
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}
