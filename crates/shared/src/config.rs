//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Webhook authentication configuration.
    pub webhook: WebhookConfig,
    /// Balance ledger service configuration.
    pub ledger: LedgerConfig,
    /// OTP provider configuration.
    pub otp: OtpConfig,
    /// BYON policy configuration.
    #[serde(default)]
    pub byon: ByonConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Webhook authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret for HMAC-SHA256 signature verification.
    pub secret: String,
    /// Maximum allowed clock skew between the request timestamp and server
    /// time, in seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
}

fn default_tolerance_secs() -> i64 {
    300 // 5 minutes
}

/// Balance ledger service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the internal balance ledger service.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
}

/// OTP provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Base URL of the OTP verification provider.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
}

/// BYON policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ByonConfig {
    /// Maximum OTP sends per customer per UTC calendar day.
    #[serde(default = "default_daily_send_limit")]
    pub daily_send_limit: u32,
    /// Maximum BYON numbers a customer may hold.
    #[serde(default = "default_number_limit")]
    pub number_limit: u32,
}

impl Default for ByonConfig {
    fn default() -> Self {
        Self {
            daily_send_limit: default_daily_send_limit(),
            number_limit: default_number_limit(),
        }
    }
}

fn default_daily_send_limit() -> u32 {
    10
}

fn default_number_limit() -> u32 {
    5
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("NUMERA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
