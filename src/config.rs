use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CURRENCY: &str = "RUB";
const CONFIG_DIR: &str = "config";

/// SMTP transport configuration for outbound confirmation email.
/// When absent, mail delivery degrades to a no-op and intake responses
/// report `email_sent: false`.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. "Memoria <orders@memoria.example>"
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// ISO 4217 currency code for orders
    #[serde(default = "default_currency")]
    #[validate(length(min = 3, max = 3))]
    pub currency: String,

    /// Public base URL used to build mock checkout links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Operator address that receives a copy of every order confirmation
    #[serde(default)]
    #[validate(email)]
    pub operator_email: Option<String>,

    /// Shared secret for the signed acquiring webhook; endpoint refuses
    /// traffic when unset
    #[serde(default)]
    pub acquiring_webhook_secret: Option<String>,

    /// SMTP settings for confirmation email
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_public_base_url() -> String {
    format!("http://localhost:{}", DEFAULT_PORT)
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling.
    pub fn new(
        database_url: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            currency: default_currency(),
            public_base_url: default_public_base_url(),
            operator_email: None,
            acquiring_webhook_secret: None,
            smtp: None,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    /// Permissive CORS is acceptable in development or under explicit override.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://memoria.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("memoria_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        )
    }

    #[test]
    fn development_allows_permissive_cors() {
        let cfg = base_config();
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn production_requires_explicit_cors_override() {
        let mut cfg = base_config();
        cfg.environment = "production".to_string();
        assert!(!cfg.should_allow_permissive_cors());
        cfg.cors_allow_any_origin = true;
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn currency_defaults_to_rub() {
        assert_eq!(base_config().currency, "RUB");
    }
}
