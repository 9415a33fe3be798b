//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `SALVADANAIO__SECTION__KEY`
//! environment variables.
//!
//! See `settings.toml` for the configuration.
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    /// IANA name of the timezone deciding which day "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            interval_secs: default_scheduler_interval(),
        }
    }
}

/// Splitwise expenses are read from a JSON file kept up to date by an
/// external exporter.
#[derive(Debug, Deserialize)]
pub struct Splitwise {
    pub feed: PathBuf,
    #[serde(default = "default_splitwise_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    #[serde(default)]
    pub scheduler: Scheduler,
    pub splitwise: Option<Splitwise>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_scheduler_interval() -> u64 {
    3600
}

fn default_splitwise_interval() -> u64 {
    900
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("SALVADANAIO").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
