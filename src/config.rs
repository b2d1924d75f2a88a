//! # Configuration Management
//!
//! Loads `tide-config.toml`: the default location, where tide extrema come
//! from, how the offline model samples the day, and the plot size. A missing
//! or invalid file falls back to defaults so the tool always runs.

use crate::extremum_store::SummaryCache;
use crate::query::{Query, QueryOptions};
use crate::HeightUnit;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub location: LocationConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub display: DisplayConfig,
}

/// Where to look up tides
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Human-readable name for the chart header
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Tide service and cache settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// WorldTides-compatible extremes endpoint
    pub api_url: String,
    /// Service key; without one only the offline model is used
    #[serde(default)]
    pub api_key: Option<String>,
    pub cache_dir: PathBuf,
    pub cache_ttl_minutes: u64,
    /// Hard deadline per fetch, 0 disables it
    pub fetch_timeout_secs: u64,
}

/// Options forwarded with every query
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub smooth_window_minutes: Option<u32>,
    #[serde(default)]
    pub step_minutes: Option<u32>,
}

/// Plot size and label units
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub units: HeightUnit,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                name: "Portland, ME".to_string(),
                latitude: 43.6567,
                longitude: -70.2467,
            },
            source: SourceConfig {
                api_url: "https://www.worldtides.info/api/v3".to_string(),
                api_key: None,
                cache_dir: std::env::temp_dir().join("tide-sampler"),
                cache_ttl_minutes: 30,
                fetch_timeout_secs: 20,
            },
            sampling: SamplingConfig {
                smooth_window_minutes: None,
                step_minutes: Some(10),
            },
            display: DisplayConfig {
                width: 400,
                height: 300,
                units: HeightUnit::Metric,
            },
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(location = %config.location.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Write this configuration as TOML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Query for the configured location and sampling options.
    pub fn query(&self) -> Query {
        Query::new(self.location.latitude, self.location.longitude).with_options(QueryOptions {
            smooth_window_minutes: self.sampling.smooth_window_minutes,
            step_minutes: self.sampling.step_minutes,
            reference_instant: None,
        })
    }

    pub fn cache(&self) -> SummaryCache {
        SummaryCache::new(
            self.source.cache_dir.clone(),
            Duration::from_secs(self.source.cache_ttl_minutes * 60),
        )
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.source.fetch_timeout_secs > 0)
            .then(|| Duration::from_secs(self.source.fetch_timeout_secs))
    }
}
