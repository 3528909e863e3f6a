use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid config path: {0}")]
    InvalidPath(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    #[serde(default)]
    pub toolkit: ToolkitSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub pdb: PdbSettings,
    #[serde(default)]
    pub releases: ReleaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolkitSettings {
    pub binary: PathBuf,
    pub script_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl Default for ToolkitSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("matlab"),
            script_dir: PathBuf::from("matlab"),
            work_dir: PathBuf::from("tmp"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub workers: usize,
    pub retries: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdbSettings {
    pub search_url: String,
    pub report_url: String,
    pub obsolete_url: String,
}

impl Default for PdbSettings {
    fn default() -> Self {
        Self {
            search_url: "https://search.rcsb.org/rcsbsearch/v2/query".to_string(),
            report_url: "https://www.rcsb.org/pdb/rest/customReport.csv".to_string(),
            obsolete_url: "https://files.wwpdb.org/pub/pdb/data/status/obsolete.dat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReleaseSettings {
    pub cache_urls: Vec<String>,
    pub report_dir: PathBuf,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            cache_urls: Vec::new(),
            report_dir: PathBuf::from("reports"),
        }
    }
}

/// Loads `.env`, then the config file, then the process environment, each
/// layer overriding the previous one (`DATABASE_URL` overrides
/// `database_url`).
pub fn load_settings(config: &Path) -> Result<Settings, SettingsError> {
    dotenv().ok();
    let config_file = config
        .to_str()
        .ok_or_else(|| SettingsError::InvalidPath(config.to_path_buf()))?;

    let settings = ConfigBuilder::<DefaultState>::default()
        .add_source(File::with_name(config_file))
        .add_source(Environment::default().try_parsing(true))
        .build()?;

    Ok(settings.try_deserialize()?)
}
