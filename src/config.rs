use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collector::DEFAULT_MAX_PAGES;
use crate::error::ConfigError;

const ENV_PREFIX: &str = "JOURNALS";
const DEFAULT_CONFIG_FILE: &str = "journals.toml";
const CACHE_FILE: &str = "journals_cache.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listing index; relative detail links resolve against its origin.
    pub base_url: String,
    pub per_page: u32,
    /// Upper bound on the page count a listing may advertise.
    pub max_pages: u32,
    pub workers: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub catalogue_path: PathBuf,
    pub fallback_path: PathBuf,
    pub filtered_path: PathBuf,
    pub cache_dir: PathBuf,
    pub progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://journalrank.rcsi.science/ru/record-sources/".into(),
            per_page: 100,
            max_pages: DEFAULT_MAX_PAGES,
            workers: 32,
            timeout_secs: 5,
            user_agent: "Mozilla/5.0".into(),
            accept_language: "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7".into(),
            catalogue_path: "vak_rsci_journals.csv".into(),
            fallback_path: "vak_rsci_journals_alt.csv".into(),
            filtered_path: "filtered_journals.csv".into(),
            cache_dir: "cache".into(),
            progress: true,
        }
    }
}

impl Settings {
    /// Defaults, then the optional TOML file, then `JOURNALS__*` env vars.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(file, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn layered(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Cache file path, creating the cache directory or falling back to the
    /// system temp directory when it cannot be created.
    pub fn cache_path(&self) -> PathBuf {
        match std::fs::create_dir_all(&self.cache_dir) {
            Ok(()) => self.cache_dir.join(CACHE_FILE),
            Err(e) => {
                warn!(
                    dir = %self.cache_dir.display(),
                    error = %e,
                    "cache directory unavailable, using temp dir"
                );
                std::env::temp_dir().join(CACHE_FILE)
            }
        }
    }
}
