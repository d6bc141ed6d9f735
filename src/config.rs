use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

/// Tuning for the payment confirmation loop.
///
/// All values have working defaults; environment variables override them for
/// deployments that need a different gateway cadence.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Delay between polling ticks while a push payment awaits confirmation
    pub poll_interval_ms: u64,
    /// Ticks to let pass before the first status check is issued
    pub grace_ticks: u32,
    /// Ticks after which polling gives up and falls back to manual entry
    pub max_attempts: u32,
    /// Minimum accepted length for a manually entered confirmation code
    pub min_confirmation_code_len: usize,
    /// International dialing prefix replacing the local trunk digit
    pub country_code: String,
    /// Currency code recorded on completed payments
    pub currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            grace_ticks: 2,
            max_attempts: 10,
            min_confirmation_code_len: 8,
            country_code: "254".to_string(),
            currency: "KES".to_string(),
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let poll_interval_ms = match env::var("PAYMENT_POLL_INTERVAL_MS") {
            Ok(value) => value
                .parse()
                .context("PAYMENT_POLL_INTERVAL_MS must be a valid number")?,
            Err(_) => defaults.poll_interval_ms,
        };

        let grace_ticks = match env::var("PAYMENT_GRACE_TICKS") {
            Ok(value) => value
                .parse()
                .context("PAYMENT_GRACE_TICKS must be a valid number")?,
            Err(_) => defaults.grace_ticks,
        };

        let max_attempts = match env::var("PAYMENT_MAX_ATTEMPTS") {
            Ok(value) => value
                .parse()
                .context("PAYMENT_MAX_ATTEMPTS must be a valid number")?,
            Err(_) => defaults.max_attempts,
        };

        let min_confirmation_code_len = match env::var("PAYMENT_MIN_CODE_LEN") {
            Ok(value) => value
                .parse()
                .context("PAYMENT_MIN_CODE_LEN must be a valid number")?,
            Err(_) => defaults.min_confirmation_code_len,
        };

        let country_code =
            env::var("PAYMENT_COUNTRY_CODE").unwrap_or_else(|_| defaults.country_code);
        let currency = env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| defaults.currency);

        let config = Self {
            poll_interval_ms,
            grace_ticks,
            max_attempts,
            min_confirmation_code_len,
            country_code,
            currency,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("PAYMENT_POLL_INTERVAL_MS must be greater than 0"));
        }

        if self.max_attempts <= self.grace_ticks {
            return Err(anyhow!(
                "PAYMENT_MAX_ATTEMPTS ({}) must be greater than PAYMENT_GRACE_TICKS ({})",
                self.max_attempts,
                self.grace_ticks
            ));
        }

        if self.min_confirmation_code_len == 0 {
            return Err(anyhow!("PAYMENT_MIN_CODE_LEN must be greater than 0"));
        }

        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!(
                "PAYMENT_COUNTRY_CODE must contain only digits, got '{}'",
                self.country_code
            ));
        }

        if self.currency.trim().is_empty() {
            return Err(anyhow!("PAYMENT_CURRENCY cannot be empty"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
