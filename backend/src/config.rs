//! Configuration management for the Farm Ledger backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FARMLEDGER_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use uuid::Uuid;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Ledger behaviour
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret used to verify bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Items expiring within this many days raise an alert
    pub expiry_warning_days: i64,

    /// Category for income derived from issued invoices
    pub sales_category_id: Option<Uuid>,

    /// Category for expenses derived from received purchase orders
    pub purchases_category_id: Option<Uuid>,

    /// Category for income from invoice payments
    pub payments_category_id: Option<Uuid>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FARMLEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("ledger.expiry_warning_days", 14)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FARMLEDGER_ prefix)
            .add_source(
                Environment::with_prefix("FARMLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: 14,
            sales_category_id: None,
            purchases_category_id: None,
            payments_category_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_ledger_section_from_toml() {
        let sales = Uuid::new_v4();
        let toml = format!(
            r#"
            environment = "test"

            [server]
            port = 8080
            host = "127.0.0.1"

            [database]
            url = "postgres://localhost/farm_ledger"
            max_connections = 5
            min_connections = 1

            [jwt]
            secret = "secret"

            [ledger]
            expiry_warning_days = 7
            sales_category_id = "{sales}"
            "#
        );

        let loaded: Config = config::Config::builder()
            .add_source(File::from_str(&toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.ledger.expiry_warning_days, 7);
        assert_eq!(loaded.ledger.sales_category_id, Some(sales));
        assert_eq!(loaded.ledger.purchases_category_id, None);
    }
}
