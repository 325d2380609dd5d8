// MySQL pool configuration for the ledger store.
//
// Ledger transactions hold row locks while a whole payment batch validates
// and applies, so the pool timeouts are tunable: a deployment with large
// multi-invoice payments raises the acquire timeout instead of editing code.

use crate::core::{LedgerError, Result};
use serde::Deserialize;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    /// Connections kept warm in the pool
    pub pool_size: u32,

    pub max_connections: u32,

    /// How long a ledger operation may wait for a connection
    pub acquire_timeout_secs: u64,

    /// Idle connection lifetime before the pool drops it
    pub idle_timeout_secs: u64,

    /// Hard connection lifetime cap
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let config = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| LedgerError::Configuration("DATABASE_URL not set".to_string()))?,
            pool_size: parse_var("DATABASE_POOL_SIZE", 10)?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 20)?,
            acquire_timeout_secs: parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?,
            idle_timeout_secs: parse_var("DATABASE_IDLE_TIMEOUT_SECS", 600)?,
            max_lifetime_secs: parse_var("DATABASE_MAX_LIFETIME_SECS", 1800)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the pool shape before any connection is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(LedgerError::Configuration(
                "Database URL cannot be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(LedgerError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }
        if self.pool_size > self.max_connections {
            return Err(LedgerError::Configuration(format!(
                "DATABASE_POOL_SIZE ({}) cannot exceed DATABASE_MAX_CONNECTIONS ({})",
                self.pool_size, self.max_connections
            )));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(LedgerError::Configuration(
                "DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Connect a pool shaped by this configuration.
    pub async fn create_pool(&self) -> Result<MySqlPool> {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&self.url)
            .await
            .map_err(LedgerError::Database)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| LedgerError::Configuration(format!("Invalid {}", name))),
        Err(_) => Ok(default),
    }
}
