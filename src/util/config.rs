use crate::util::paths;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_port: u16,
    pub max_requests_per_minute: usize,
    pub backoff_floor_secs: u64,
    pub backoff_ceiling_secs: u64,
    pub cooldown_secs: u64,
    pub niri_bin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: 17324,
            max_requests_per_minute: 60,
            backoff_floor_secs: 1,
            backoff_ceiling_secs: 64,
            cooldown_secs: 300,
            niri_bin: "niri".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = paths::config_dir().join("config.toml");

        let mut builder = Config::builder()
            .set_default("listen_port", 17324)?
            .set_default("max_requests_per_minute", 60)?
            .set_default("backoff_floor_secs", 1)?
            .set_default("backoff_ceiling_secs", 64)?
            .set_default("cooldown_secs", 300)?
            .set_default("niri_bin", "niri")?;

        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        }

        // Allow environment variables to override config
        builder = builder.add_source(Environment::with_prefix("LAUNCHKIT"));

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    pub fn backoff_floor(&self) -> Duration {
        Duration::from_secs(self.backoff_floor_secs)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_secs(self.backoff_ceiling_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}
