//! API configuration

use serde::Deserialize;

use core_kernel::{Timezone, Won};
use domain_claims::AdjudicationConfig;

/// API configuration
///
/// Read from `API_`-prefixed environment variables; anything unset keeps its
/// default. `DATABASE_URL` overrides `API_DATABASE_URL` when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Approved totals up to this many won may skip review
    pub auto_approve_ceiling: i64,
    pub auto_approve_max_fraud_score: u8,
    pub terms_product_code: String,
    pub timezone: Timezone,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let adjudication = AdjudicationConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claims".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_json: false,
            auto_approve_ceiling: 3_000_000,
            auto_approve_max_fraud_score: adjudication.auto_approve_max_fraud_score,
            terms_product_code: adjudication.terms_product_code,
            timezone: adjudication.timezone,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .set_override_option("database_url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pipeline settings derived from this configuration
    pub fn adjudication(&self) -> AdjudicationConfig {
        AdjudicationConfig {
            auto_approve_ceiling: Won::from_i64(self.auto_approve_ceiling),
            auto_approve_max_fraud_score: self.auto_approve_max_fraud_score,
            terms_product_code: self.terms_product_code.clone(),
            timezone: self.timezone,
        }
    }
}
