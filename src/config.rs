use std::{path::Path, time::Duration};

use alloy::primitives::Address;
use serde::Deserialize;

use crate::{
    constants::{
        CONFIG_FILE_PATH, DEFAULT_API_URL, DEFAULT_INVITOR_ADDRESS, DEFAULT_RPC_URL,
        PROXIES_FILE_PATH, WALLETS_FILE_PATH,
    },
    errors::ConfigError,
};

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    pub rpc_url: String,
    pub api_url: String,
    /// Pause between wallets, in seconds, as `[min, max]`.
    pub delay_range: [u64; 2],
    /// `true` claims right away, `false` requests the 72 hour locked claim.
    pub instant_claim: bool,
    pub invitor_address: Address,
    pub max_attempts: usize,
    /// Seconds.
    pub retry_delay: u64,
    /// Seconds.
    pub confirmation_timeout: u64,
    pub wallets_file: String,
    pub proxies_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            delay_range: [3, 10],
            instant_claim: true,
            invitor_address: DEFAULT_INVITOR_ADDRESS,
            max_attempts: 5,
            retry_delay: 3,
            confirmation_timeout: 60,
            wallets_file: WALLETS_FILE_PATH.to_string(),
            proxies_file: PROXIES_FILE_PATH.to_string(),
        }
    }
}

impl Config {
    async fn read_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg_str = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let config: Self = toml::from_str(&cfg_str)?;
        config.validate()?;

        Ok(config)
    }

    /// Reads `data/config.toml`, falling back to defaults when the file does not exist.
    pub async fn read_default() -> Result<Self, ConfigError> {
        if !Path::new(CONFIG_FILE_PATH).exists() {
            tracing::warn!("{CONFIG_FILE_PATH} not found, using default settings");
            return Ok(Self::default());
        }

        Self::read_from_file(CONFIG_FILE_PATH).await
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [min, max] = self.delay_range;
        if min > max {
            return Err(ConfigError::Validation(format!(
                "DELAY_RANGE minimum ({min}) is greater than maximum ({max})"
            )));
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn delay_bounds(&self) -> (Duration, Duration) {
        let [min, max] = self.delay_range;
        (Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout)
    }
}
