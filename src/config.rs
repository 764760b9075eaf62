use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CONFIG_VERSION: u32 = 1;

/// User settings stored in `~/.picksync/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub rsync_path: PathBuf,
    pub fzf_path: PathBuf,
    /// How many levels below home the fuzzy search offers
    pub search_depth: usize,
    /// Leave dot-directories out of the fuzzy candidates
    pub skip_hidden: bool,
    /// Glob patterns passed to the sync engine as `--exclude`
    pub excludes: Vec<String>,
    /// Pre-filled value of the destination input box
    pub default_destination: Option<PathBuf>,
    pub version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rsync_path: PathBuf::from("rsync"),
            fzf_path: PathBuf::from("fzf"),
            search_depth: 4,
            skip_hidden: true,
            excludes: [".DS_Store", "Thumbs.db", "._*", "*.tmp", "*.temp", "*.swp", "*~"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_destination: None,
            version: Some(CONFIG_VERSION),
        }
    }
}

impl Config {
    /// `~/.picksync`, home of the config file and the diagnostic log.
    pub fn app_dir(home_dir: &Path) -> PathBuf {
        home_dir.join(".".to_owned() + env!("CARGO_PKG_NAME"))
    }

    /// Load the config, writing the defaults on first start.
    pub fn init(home_dir: &Path) -> Result<Self> {
        let app_dir = Self::app_dir(home_dir);
        let config_path = app_dir.join("config.json");
        if !config_path.exists() {
            std::fs::create_dir_all(&app_dir)
                .with_context(|| format!("cannot create {}", app_dir.display()))?;
            let config = Config::default();
            config.save_to(&config_path)?;
            tracing::info!("wrote default config to {}", config_path.display());
            return Ok(config);
        }
        Ok(Config::read_from(&config_path))
    }

    /// Value offered in the destination prompt.
    pub fn destination_hint(&self, home_dir: &Path) -> PathBuf {
        self.default_destination
            .clone()
            .unwrap_or_else(|| home_dir.join("Backups"))
    }
}

/// JSON persistence with a forgiving read: a missing or broken file yields the default.
pub trait StorageObject: Serialize + DeserializeOwned + Default {
    fn pretty_json(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("serialization failed: {}, writing an empty object", e);
                "{}".to_string()
            }
        }
    }

    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.pretty_json())
            .with_context(|| format!("cannot write {}", path.display()))
    }

    fn read_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("cannot read {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("cannot parse {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}

impl StorageObject for Config {}
