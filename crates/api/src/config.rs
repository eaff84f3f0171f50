use serde::Deserialize;
use std::net::SocketAddr;

use shared::jwt::{JwtConfig, JwtError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Tracker vendor command API
    pub vendor: VendorConfig,
    /// JWT verification for operator tokens
    pub jwt: JwtAuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on webhook bodies, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Per-operator limit on command routes. 0 disables rate limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

#[derive(Clone, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_api_url")]
    pub api_url: String,

    /// Sent verbatim in the Authorization header. Required.
    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_vendor_timeout")]
    pub timeout_secs: u64,

    /// Default for `cacheCommandsWhenOffline` when a caller does not choose
    #[serde(default)]
    pub cache_commands_when_offline: bool,
}

impl std::fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "cache_commands_when_offline",
                &self.cache_commands_when_offline,
            )
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format (RS256)
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format (RS256)
    #[serde(default)]
    pub public_key: String,

    /// Shared secret (HS256). Used when no RSA key pair is configured.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthConfig")
            .field("has_rsa_keys", &self.has_rsa_keys())
            .field("has_secret", &!self.secret.is_empty())
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl JwtAuthConfig {
    fn has_rsa_keys(&self) -> bool {
        !self.private_key.is_empty() && !self.public_key.is_empty()
    }

    /// Builds the token verifier. An RSA key pair takes precedence over a secret.
    pub fn build(&self) -> Result<JwtConfig, JwtError> {
        if self.has_rsa_keys() {
            JwtConfig::from_rsa_pem(
                &self.private_key,
                &self.public_key,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        } else {
            JwtConfig::from_secret(
                &self.secret,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rate_limit() -> u32 {
    100
}
fn default_vendor_api_url() -> String {
    "https://api.totarget.net:8108/api/send-command".to_string()
}
fn default_vendor_timeout() -> u64 {
    30
}
fn default_access_token_expiry() -> i64 {
    3600
}
fn default_jwt_leeway() -> u64 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with FG__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FG").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 100

            [vendor]
            api_url = "https://api.totarget.net:8108/api/send-command"
            timeout_secs = 30
            cache_commands_when_offline = false

            [jwt]
            access_token_expiry_secs = 3600
            leeway_secs = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Validation is left to the caller so partial configs can be inspected
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "FG__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.vendor.api_token.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "FG__VENDOR__API_TOKEN environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.vendor.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "vendor.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !self.jwt.has_rsa_keys() && self.jwt.secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "jwt.private_key/jwt.public_key or jwt.secret must be set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
