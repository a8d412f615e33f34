use crate::error::{JackpotError, Result};
use crate::types::Money;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JackpotConfig {
    /// Deposit window, counted from the first admitted participant.
    pub round_duration: Duration,
    pub rolling_delay: Duration,
    pub next_round_delay: Duration,
    pub max_participants: usize,
    /// Backlog length past which every enqueue logs a warning.
    pub queue_warn_threshold: usize,
    pub tax: TaxPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxPolicy {
    pub min_pot: Money,
    pub floor_percent: u64,
    pub ceiling_percent: u64,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            min_pot: Money::from_units(10),
            floor_percent: 5,
            ceiling_percent: 10,
        }
    }
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_secs(99),
            rolling_delay: Duration::from_secs(3),
            next_round_delay: Duration::from_secs(10),
            max_participants: 20,
            queue_warn_threshold: 100,
            tax: TaxPolicy::default(),
        }
    }
}

impl JackpotConfig {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: JackpotConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.round_duration.is_zero() {
            return Err(JackpotError::config("Round duration must be greater than 0"));
        }

        if self.max_participants == 0 {
            return Err(JackpotError::config(
                "Max participants must be greater than 0",
            ));
        }

        if self.tax.floor_percent > self.tax.ceiling_percent {
            return Err(JackpotError::config(
                "Tax floor percent cannot exceed the ceiling percent",
            ));
        }

        if self.tax.ceiling_percent > 100 {
            return Err(JackpotError::config("Tax ceiling cannot exceed 100%"));
        }

        Ok(())
    }
}
