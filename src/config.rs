use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RAZORPAY_BASE_URL: &str = "https://api.razorpay.com";
const DEFAULT_CURRENCY: &str = "INR";

/// Razorpay credentials and client tuning
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RazorpayConfig {
    /// Public key id, handed to the checkout widget
    #[serde(default)]
    pub key_id: String,

    /// Shared secret used for API auth and signature verification
    #[serde(default)]
    pub key_secret: String,

    #[serde(default = "default_razorpay_base_url")]
    pub base_url: String,

    /// ISO currency code for remote payment orders
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            base_url: default_razorpay_base_url(),
            currency: default_currency(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Outbound mail relay
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender mailbox, e.g. `Honey Palace <orders@honeypalace.in>`
    #[serde(default = "default_smtp_from")]
    pub from: String,

    /// Use STARTTLS; disable only for local relays such as MailHog
    #[serde(default = "default_true_bool")]
    pub starttls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: default_smtp_from(),
            starttls: true,
        }
    }
}

/// Pricing rules used by checkout quotes and the dashboard
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutConfig {
    /// Orders with a subtotal strictly above this ship for free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: Decimal,

    /// Products with less stock than this are reported as low stock
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            shipping_fee: default_shipping_fee(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port (1024-65535)
    #[serde(default = "default_port")]
    #[validate(range(min = 1024))]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

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

    #[serde(default)]
    #[validate]
    pub razorpay: RazorpayConfig,

    #[serde(default)]
    #[validate]
    pub smtp: SmtpConfig,

    #[serde(default)]
    pub checkout: CheckoutConfig,

    /// Echo the generated OTP in the create-order response. Test environments only.
    #[serde(default)]
    pub expose_otp_in_response: bool,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            razorpay: RazorpayConfig::default(),
            smtp: SmtpConfig::default(),
            checkout: CheckoutConfig::default(),
            expose_otp_in_response: false,
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Parsed CORS origins; empty means permissive
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() {
            if self.razorpay.key_id.trim().is_empty() {
                let mut err = ValidationError::new("razorpay_key_id_required");
                err.message = Some("Set APP__RAZORPAY__KEY_ID outside development".into());
                errors.add("razorpay", err);
            }
            if self.razorpay.key_secret.trim().is_empty() {
                let mut err = ValidationError::new("razorpay_key_secret_required");
                err.message = Some("Set APP__RAZORPAY__KEY_SECRET outside development".into());
                errors.add("razorpay", err);
            }
        }

        if self.is_production() && self.expose_otp_in_response {
            let mut err = ValidationError::new("expose_otp_in_production");
            err.message = Some("expose_otp_in_response must be false in production".into());
            errors.add("expose_otp_in_response", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
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

fn default_true_bool() -> bool {
    true
}

fn default_razorpay_base_url() -> String {
    DEFAULT_RAZORPAY_BASE_URL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "Honey Palace <no-reply@honeypalace.in>".to_string()
}

fn default_free_shipping_threshold() -> Decimal {
    dec!(500)
}

fn default_shipping_fee() -> Decimal {
    dec!(50)
}

fn default_low_stock_threshold() -> i32 {
    10
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("honeypalace_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
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
        .set_default("database_url", "sqlite://honeypalace.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
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

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
