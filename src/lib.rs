//! IPD inpatient module core library
//!
//! This module exports bed allocation, clinical documentation, pharmacy
//! recommendations and discharge billing for the IPD service.

pub mod api;
pub mod domain;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;

pub use db::Database;
pub use error::{IpdError, Result};

/// Application configuration
pub mod config {
    use serde::Deserialize;

    use crate::domain::billing::BillingPolicy;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct Config {
        pub server: ServerConfig,
        pub database: DatabaseConfig,
        pub logging: LoggingConfig,
        pub cors: CorsConfig,
        pub numbering: NumberingConfig,
        pub billing: BillingPolicy,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct DatabaseConfig {
        pub url: String,
        pub max_connections: u32,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct LoggingConfig {
        pub level: String,
        pub json: bool,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct CorsConfig {
        /// Empty allows any origin
        pub allowed_origins: Vec<String>,
    }

    /// Prefixes and zero-padding for UHIDs and IP numbers
    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct NumberingConfig {
        pub uhid_prefix: String,
        pub ip_prefix: String,
        pub width: usize,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: "127.0.0.1".into(),
                port: 8080,
            }
        }
    }

    impl Default for DatabaseConfig {
        fn default() -> Self {
            Self {
                url: "sqlite://ipd.db".into(),
                max_connections: 5,
            }
        }
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: "info".into(),
                json: false,
            }
        }
    }

    impl Default for NumberingConfig {
        fn default() -> Self {
            Self {
                uhid_prefix: "UH".into(),
                ip_prefix: "IP".into(),
                width: 6,
            }
        }
    }

    impl NumberingConfig {
        pub fn uhid(&self, seq: i64) -> String {
            format!("{}{:0width$}", self.uhid_prefix, seq, width = self.width)
        }

        pub fn ip_number(&self, seq: i64) -> String {
            format!("{}{:0width$}", self.ip_prefix, seq, width = self.width)
        }
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, config::ConfigError> {
        let env = std::env::var("IPD_ENV").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            // Start with default settings
            .add_source(config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables, e.g. IPD_SERVER__PORT=9000
            .add_source(
                config::Environment::with_prefix("IPD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn numbers_are_zero_padded() {
            let numbering = NumberingConfig::default();
            assert_eq!(numbering.uhid(42), "UH000042");
            assert_eq!(numbering.ip_number(7), "IP000007");
        }

        #[test]
        fn empty_source_falls_back_to_defaults() {
            let config: Config = config::Config::builder()
                .build()
                .unwrap()
                .try_deserialize()
                .unwrap();
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.billing.minimum_bed_days, 1);
            assert!(config.cors.allowed_origins.is_empty());
        }
    }
}
