// Configuration for the game binary, read from Snake.toml

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::arena::{MAX_DIMENSION, MIN_DIMENSION};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "SNAKE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "Snake.toml";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub game: GameConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square grid
    pub dimension: u16,
    pub tick_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig { dimension: 20, tick_interval_ms: 250 }
    }
}

impl GameConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter, RUST_LOG takes precedence
    pub level: String,
    /// Log output file. Nothing is logged without one, the terminal is in raw mode.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: "info".to_string(), file: None }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Uses `$SNAKE_CONFIG` if set, then `Snake.toml` if it exists, then the
    /// built-in defaults.
    pub fn load_or_default() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Config::default())
    }

    pub fn validate(&self) -> Result<()> {
        let dim = self.game.dimension;
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&dim) {
            bail!("game.dimension must be within {}..={}, got {}", MIN_DIMENSION, MAX_DIMENSION, dim);
        }
        if self.game.tick_interval_ms == 0 {
            bail!("game.tick_interval_ms must be positive");
        }
        Ok(())
    }
}
