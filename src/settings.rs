use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "PROFILE_TAP";
const DEFAULT_COLLECTOR_URL: &str = "http://192.168.100.135:3000/collect";
const DEFAULT_SETTLE_DELAY_MS: i64 = 3000;
const DEFAULT_DB_PATH: &str = "data/profiles.sqlite";
const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 10;

/// Runtime settings. Every key has a default; `PROFILE_TAP_<KEY>` overrides it.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub collector_url: String,
    pub settle_delay_ms: u64,
    pub db_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_env(env: Environment) -> Result<Self> {
        let settings = Config::builder()
            .set_default("collector_url", DEFAULT_COLLECTOR_URL)?
            .set_default("settle_delay_ms", DEFAULT_SETTLE_DELAY_MS)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .add_source(env)
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
