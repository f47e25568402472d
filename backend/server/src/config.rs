use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cookie_secure: bool,
    pub payment_submit_delay: Duration,
    pub payment_processing_time: Duration,
    pub payment_retention: Duration,
    pub cors_max_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            cookie_secure: false,
            payment_submit_delay: Duration::from_millis(2000),
            payment_processing_time: Duration::from_millis(10_000),
            payment_retention: Duration::from_secs(60 * 60),
            cors_max_age: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
            payment_submit_delay: Duration::from_millis(try_load("PAYMENT_SUBMIT_DELAY_MS", "2000")?),
            payment_processing_time: Duration::from_millis(try_load(
                "PAYMENT_PROCESSING_MS",
                "10000",
            )?),
            payment_retention: Duration::from_secs(try_load("PAYMENT_RETENTION_SECS", "3600")?),
            cors_max_age: Duration::from_secs(try_load("CORS_MAX_AGE_SECS", "3600")?),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("{e}")
        })
        .with_context(|| format!("Environment misconfigured: {key}={raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_unset() {
        let port: u16 = try_load("STOREFRONT_TEST_UNSET_PORT", "1111").unwrap();
        assert_eq!(port, 1111);
    }

    #[test]
    fn test_bad_default_is_an_error() {
        let result: Result<u16> = try_load("STOREFRONT_TEST_UNSET_PORT", "not-a-port");
        let message = format!("{:#}", result.unwrap_err());

        assert!(message.contains("STOREFRONT_TEST_UNSET_PORT=not-a-port"));
    }

    // Only test that touches the variables `Config::load` reads.
    #[test]
    fn test_load_reads_environment() {
        // SAFETY: no other test in this binary reads or writes these variables.
        unsafe {
            env::set_var("COOKIE_SECURE", "true");
            env::set_var("PAYMENT_RETENTION_SECS", "120");
        }
        let config = Config::load().unwrap();
        assert!(config.cookie_secure);
        assert_eq!(config.payment_retention, Duration::from_secs(120));
        assert_eq!(config.payment_processing_time, Duration::from_millis(10_000));

        unsafe { env::set_var("PAYMENT_PROCESSING_MS", "ten seconds") };
        let message = format!("{:#}", Config::load().unwrap_err());
        assert!(message.contains("PAYMENT_PROCESSING_MS=ten seconds"));

        unsafe { env::set_var("COOKIE_SECURE", "yes") };
        let message = format!("{:#}", Config::load().unwrap_err());
        assert!(message.contains("COOKIE_SECURE=yes"));

        unsafe {
            env::remove_var("COOKIE_SECURE");
            env::remove_var("PAYMENT_PROCESSING_MS");
            env::remove_var("PAYMENT_RETENTION_SECS");
        }
    }
}
