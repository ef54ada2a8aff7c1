use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_parse};

/// Tuning knobs of the catalog consistency layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Upper bound for a unit of work, action and commit included
    pub unit_of_work_timeout: Duration,
    /// Read-check-write cycles a stock decrement may take before giving up
    pub stock_update_attempts: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            unit_of_work_timeout: Duration::from_millis(5_000),
            stock_update_attempts: 5,
        }
    }
}

impl FromEnv for CatalogConfig {
    /// Reads `CATALOG_UOW_TIMEOUT_MS` and `CATALOG_STOCK_UPDATE_ATTEMPTS`,
    /// falling back to the defaults when unset.
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_ms: u64 = env_parse("CATALOG_UOW_TIMEOUT_MS", 5_000)?;
        let stock_update_attempts: u32 = env_parse("CATALOG_STOCK_UPDATE_ATTEMPTS", 5)?;

        if stock_update_attempts == 0 {
            return Err(ConfigError::ParseError {
                key: "CATALOG_STOCK_UPDATE_ATTEMPTS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            unit_of_work_timeout: Duration::from_millis(timeout_ms),
            stock_update_attempts,
        })
    }
}
