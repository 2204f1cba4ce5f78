//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;
use std::fmt;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub upay: UpayConfig,
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which store backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Storage configuration; `database` is only required for the Postgres backend
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: Option<DatabaseConfig>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// UPay gateway credentials and order defaults
#[derive(Clone)]
pub struct UpayConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    /// Public origin of this service, used to build the notify and redirect URLs
    pub public_base_url: String,
    pub timeout_secs: u64,
    pub chain_type: String,
    pub fiat_currency: String,
    pub product_name: String,
}

/// Users allowed to review withdrawals
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub admin_user_ids: Vec<i64>,
}

pub const DEFAULT_UPAY_BASE_URL: &str = "https://api.upay.ink";
pub const UPAY_ORDER_APPLY_PATH: &str = "/v1/api/open/order/apply";
pub const CALLBACK_PATH: &str = "/api/payments/callback";
pub const DEPOSIT_SUCCESS_PATH: &str = "/deposit/success";

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            upay: UpayConfig::from_env()?,
            admin: AdminConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        self.upay.validate()?;
        self.admin.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            _ => return Err(ConfigError::InvalidValue("STORAGE_BACKEND".to_string())),
        };

        let database = match backend {
            StorageBackend::Postgres => Some(DatabaseConfig::from_env()?),
            StorageBackend::Memory => None,
        };

        Ok(StorageConfig { backend, database })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.backend, &self.database) {
            (StorageBackend::Postgres, Some(database)) => database.validate(),
            (StorageBackend::Postgres, None) => {
                Err(ConfigError::MissingVariable("DATABASE_URL".to_string()))
            }
            (StorageBackend::Memory, _) => Ok(()),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .to_lowercase(),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl UpayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };

        Ok(UpayConfig {
            app_id: required("UPAY_APP_ID")?,
            app_secret: required("UPAY_APP_SECRET")?,
            base_url: trim_trailing_slash(
                lookup("UPAY_BASE_URL").unwrap_or_else(|| DEFAULT_UPAY_BASE_URL.to_string()),
            ),
            public_base_url: trim_trailing_slash(required("PUBLIC_BASE_URL")?),
            timeout_secs: lookup("UPAY_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("UPAY_TIMEOUT_SECS".to_string()))?,
            chain_type: lookup("UPAY_CHAIN_TYPE").unwrap_or_else(|| "1".to_string()),
            fiat_currency: lookup("UPAY_FIAT_CURRENCY").unwrap_or_else(|| "USD".to_string()),
            product_name: lookup("UPAY_PRODUCT_NAME")
                .unwrap_or_else(|| "Account Deposit".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("UPAY_BASE_URL", &self.base_url),
            ("PUBLIC_BASE_URL", &self.public_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be a valid URL",
                    key
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("UPAY_TIMEOUT_SECS".to_string()));
        }

        if self.fiat_currency.len() != 3 {
            return Err(ConfigError::InvalidValue(
                "UPAY_FIAT_CURRENCY must be a 3-letter code".to_string(),
            ));
        }

        Ok(())
    }

    pub fn order_endpoint(&self) -> String {
        format!("{}{}", self.base_url, UPAY_ORDER_APPLY_PATH)
    }

    pub fn notify_url(&self) -> String {
        format!("{}{}", self.public_base_url, CALLBACK_PATH)
    }

    pub fn redirect_url(&self) -> String {
        format!("{}{}", self.public_base_url, DEPOSIT_SUCCESS_PATH)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for UpayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpayConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("public_base_url", &self.public_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("chain_type", &self.chain_type)
            .field("fiat_currency", &self.fiat_currency)
            .field("product_name", &self.product_name)
            .finish()
    }
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AdminConfig {
            admin_user_ids: parse_id_list(
                &env::var("ADMIN_USER_IDS").unwrap_or_else(|_| "1".to_string()),
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_user_ids.iter().any(|id| *id <= 0) {
            return Err(ConfigError::InvalidValue(
                "ADMIN_USER_IDS must contain positive ids".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue(format!("ADMIN_USER_IDS: {}", s)))
        })
        .collect()
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl From<ConfigError> for crate::error::AppError {
    fn from(err: ConfigError) -> Self {
        use crate::error::{AppError, AppErrorKind, InfrastructureError};

        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: err.to_string(),
            },
        ))
    }
}
