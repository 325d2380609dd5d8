use crate::core::{LedgerError, Result};
use serde::Deserialize;
use std::env;

pub mod database;

pub use database::DatabaseConfig;

/// Ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub numbering: NumberingConfig,
    pub billing: BillingConfig,
    pub database: DatabaseConfig,
}

/// Document-number prefixes and pad widths.
#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    pub invoice_prefix: String,
    pub credit_memo_prefix: String,
    pub transaction_prefix: String,
    pub estimate_prefix: String,
    pub estimate_invoice_prefix: String,
    pub pad_width: usize,
    pub estimate_pad_width: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Fallback payment-term length when a dealer carries no credit_due_days.
    pub default_credit_due_days: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        NumberingConfig {
            invoice_prefix: "LSIN".to_string(),
            credit_memo_prefix: "LSCM".to_string(),
            transaction_prefix: "TXN".to_string(),
            estimate_prefix: "EST".to_string(),
            estimate_invoice_prefix: "INV".to_string(),
            pad_width: 4,
            estimate_pad_width: 3,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig {
            default_credit_due_days: 30,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let defaults = NumberingConfig::default();
        let config = LedgerConfig {
            numbering: NumberingConfig {
                invoice_prefix: env::var("INVOICE_NUMBER_PREFIX")
                    .unwrap_or(defaults.invoice_prefix),
                credit_memo_prefix: env::var("CREDIT_MEMO_NUMBER_PREFIX")
                    .unwrap_or(defaults.credit_memo_prefix),
                transaction_prefix: env::var("TRANSACTION_NUMBER_PREFIX")
                    .unwrap_or(defaults.transaction_prefix),
                estimate_prefix: env::var("ESTIMATE_NUMBER_PREFIX")
                    .unwrap_or(defaults.estimate_prefix),
                estimate_invoice_prefix: env::var("ESTIMATE_INVOICE_NUMBER_PREFIX")
                    .unwrap_or(defaults.estimate_invoice_prefix),
                pad_width: env::var("NUMBER_PAD_WIDTH")
                    .unwrap_or_else(|_| "4".to_string())
                    .parse()
                    .map_err(|_| {
                        LedgerError::Configuration("Invalid NUMBER_PAD_WIDTH".to_string())
                    })?,
                estimate_pad_width: env::var("ESTIMATE_NUMBER_PAD_WIDTH")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .map_err(|_| {
                        LedgerError::Configuration("Invalid ESTIMATE_NUMBER_PAD_WIDTH".to_string())
                    })?,
            },
            billing: BillingConfig {
                default_credit_due_days: env::var("DEFAULT_CREDIT_DUE_DAYS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| {
                        LedgerError::Configuration("Invalid DEFAULT_CREDIT_DUE_DAYS".to_string())
                    })?,
            },
            database: DatabaseConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, prefix) in [
            ("invoice", &self.numbering.invoice_prefix),
            ("credit memo", &self.numbering.credit_memo_prefix),
            ("transaction", &self.numbering.transaction_prefix),
            ("estimate", &self.numbering.estimate_prefix),
            ("estimate invoice", &self.numbering.estimate_invoice_prefix),
        ] {
            if prefix.trim().is_empty() {
                return Err(LedgerError::Configuration(format!(
                    "{} number prefix cannot be empty",
                    name
                )));
            }
        }

        if self.numbering.pad_width == 0 || self.numbering.estimate_pad_width == 0 {
            return Err(LedgerError::Configuration(
                "Number pad width must be greater than 0".to_string(),
            ));
        }

        self.database.validate()
    }
}
