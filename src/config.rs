use crate::model::DEFAULT_AREA;
use crate::timer::{DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    pub categories: Vec<String>,
    pub default_work_minutes: u32,
    pub default_break_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            log_level: "info".into(),
            categories: vec![
                DEFAULT_AREA.into(),
                "Study".into(),
                "Work".into(),
                "Health".into(),
                "Personal".into(),
            ],
            default_work_minutes: DEFAULT_WORK_MINUTES,
            default_break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

/// Where the store, logs and exports live.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataLayout { root: root.into() }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root.join("exports")
    }
}

impl Config {
    /// Loads `path`, or the platform config file when `path` is `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Config::default()),
            },
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        Config::parse(&data).with_context(|| format!("parsing config file {:?}", path))
    }

    pub fn parse(data: &str) -> Result<Config> {
        let mut config: Config = serde_yaml::from_str(data)?;
        config.normalize();
        Ok(config)
    }

    pub fn layout(&self, override_dir: Option<&Path>) -> Result<DataLayout> {
        if let Some(dir) = override_dir.or(self.data_dir.as_deref()) {
            return Ok(DataLayout::new(dir));
        }
        let dirs = ProjectDirs::from("", "", "dayplan").context("locating data directory")?;
        Ok(DataLayout::new(dirs.data_dir()))
    }

    fn normalize(&mut self) {
        self.categories = self
            .categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if self.categories.is_empty() {
            self.categories.push(DEFAULT_AREA.into());
        }
        self.default_work_minutes = self.default_work_minutes.max(1);
        self.default_break_minutes = self.default_break_minutes.max(1);
        self.log_level = self.log_level.trim().to_ascii_lowercase();
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dayplan").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::parse(
            "log_level: DEBUG\ncategories: [Deep work, '  ', Errands]\ndefault_work_minutes: 50\n",
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.categories, vec!["Deep work", "Errands"]);
        assert_eq!(config.default_work_minutes, 50);
        assert_eq!(config.default_break_minutes, DEFAULT_BREAK_MINUTES);
    }

    #[test]
    fn zero_lengths_and_empty_categories_are_corrected() {
        let config = Config::parse("categories: []\ndefault_break_minutes: 0\n").unwrap();
        assert_eq!(config.categories, vec![DEFAULT_AREA.to_string()]);
        assert_eq!(config.default_break_minutes, 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("categories: 12: nope").is_err());
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.yml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn override_dir_wins() {
        let mut config = Config::default();
        config.data_dir = Some(PathBuf::from("/from/config"));
        let layout = config.layout(Some(Path::new("/from/flag"))).unwrap();
        assert_eq!(layout.store_dir(), PathBuf::from("/from/flag/store"));
        let layout = config.layout(None).unwrap();
        assert_eq!(layout.export_dir(), PathBuf::from("/from/config/exports"));
    }
}
