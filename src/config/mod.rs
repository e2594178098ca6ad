// src/config/mod.rs
use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::strategy::StrategyConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub provider: ProviderConfig,
    pub telegram: TelegramConfig,
    pub status: StatusConfig,
    pub retry: RetryConfig,
    pub strategy: StrategyConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub symbol: String,
    pub check_interval_secs: u64,
    pub signal_log: PathBuf,
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            check_interval_secs: 15 * 60,
            signal_log: PathBuf::from("data/signals.csv"),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub from_symbol: String,
    pub to_symbol: String,
    pub output_size: String,
    /// H4 is aggregated from 60min bars, so it needs four times the history
    /// of the other intraday series.
    pub h4_output_size: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.alphavantage.co/query".to_string(),
            from_symbol: "XAU".to_string(),
            to_symbol: "USD".to_string(),
            output_size: "compact".to_string(),
            h4_output_size: "full".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            base_url: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    /// Both a token and a chat id are required to deliver anything.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => Some((token, chat_id)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
            jitter_ratio: 0.2,
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl Config {
    /// Reads the TOML file when present, falls back to defaults otherwise,
    /// then applies secrets from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (config, source) = Self::load_with_source(path)?;
        if source == ConfigSource::Defaults {
            warn!("Config file not found at {}, using defaults", path.display());
        }
        Ok(config)
    }

    /// Same as [`Config::load`] but leaves reporting the source to the
    /// caller, for binaries that install logging from the loaded config.
    pub fn load_with_source<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();
        let (mut config, source) = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            (config, ConfigSource::File(path.to_path_buf()))
        } else {
            (Config::default(), ConfigSource::Defaults)
        };

        dotenv::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok((config, source))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Overrides secrets with whatever `lookup` finds. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = read("ALPHA_VANTAGE_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(token) = read("TELEGRAM_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Some(chat_id) = read("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
    }
}
