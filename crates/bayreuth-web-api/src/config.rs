use std::{net::IpAddr, time::Duration};

use bayreuth_meal_api::raw::DEFAULT_BASE_URL;
use tokio::fs;

const CONFIG_ENV: &str = "MENSA_API_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "mensa_api.toml";

pub async fn read() -> anyhow::Result<Config> {
    let config_path = std::env::var(CONFIG_ENV)
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let canon = fs::canonicalize(".").await?;
    tracing::info!("try reading config file {config_path} at {canon:?}");

    let config = if fs::try_exists(&config_path).await? {
        tracing::info!("found config");

        let config = fs::read_to_string(&config_path).await?;
        let config = parse(&config)?;
        tracing::info!("read config");
        config
    } else {
        tracing::info!("config does not exist, using default config");
        Config::default()
    };

    tracing::info!("using config: {config:#?}");
    Ok(config)
}

pub fn parse(s: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(s)?;
    anyhow::ensure!(
        config.refresh.weekly_min_hour < 24,
        "refresh.weekly_min_hour must be below 24, got {}",
        config.refresh.weekly_min_hour,
    );
    Ok(config)
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: format!("openmensa-bayreuth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// cron expression with seconds, as understood by tokio-cron-scheduler
    pub schedule: String,
    /// earliest local hour for the daily week refresh
    pub weekly_min_hour: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            schedule: "0 0 * * * *".to_string(),
            weekly_min_hour: 2,
        }
    }
}
