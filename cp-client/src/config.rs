use std::fs;
use std::path::{Path, PathBuf};

use cp_render::DEFAULT_MAX_ATLAS_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown log level {0:?}")]
    LogLevel(String),
    #[error("atlas max_size must be a power of two of at least 16, got {0}")]
    AtlasSize(u32),
    #[error("reload prepare_threads must be at least 1")]
    PrepareThreads,
}

/// `client_paintings.toml`. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientPaintingsConfig {
    /// Resource packs in load order; later packs override earlier ones.
    pub packs: Vec<PathBuf>,
    pub log_level: String,
    pub atlas: AtlasConfig,
    pub reload: ReloadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub max_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    pub prepare_threads: usize,
}

impl Default for ClientPaintingsConfig {
    fn default() -> Self {
        Self {
            packs: Vec::new(),
            log_level: "info".to_string(),
            atlas: AtlasConfig::default(),
            reload: ReloadConfig::default(),
        }
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_ATLAS_SIZE,
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self { prepare_threads: 4 }
    }
}

impl ClientPaintingsConfig {
    /// Reads and validates a config file. Relative pack paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.resolve_packs(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Like [`Self::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resolve_packs(&mut self, base: &Path) {
        for pack in &mut self.packs {
            if pack.is_relative() {
                *pack = base.join(&*pack);
            }
        }
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        let max_size = self.atlas.max_size;
        if max_size < 16 || !max_size.is_power_of_two() {
            return Err(ConfigError::AtlasSize(max_size));
        }
        if self.reload.prepare_threads == 0 {
            return Err(ConfigError::PrepareThreads);
        }
        Ok(())
    }
}
