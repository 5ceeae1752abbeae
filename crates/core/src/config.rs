use crate::error::{Result, SymbolServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8111";
pub const DEFAULT_APP_PREFIX: &str = "/app/symbols/";
pub const DEFAULT_REALM: &str = "symserve";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const LISTEN_ENV: &str = "SYMSERVE_LISTEN";
const PREFIX_ENV: &str = "SYMSERVE_PREFIX";
const DATA_DIR_ENV: &str = "SYMSERVE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub app_prefix: String,
    pub data_dir: PathBuf,
    pub index_file: Option<PathBuf>,
    pub builds_dir: Option<PathBuf>,
    pub users_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub realm: String,
    pub chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            app_prefix: DEFAULT_APP_PREFIX.to_string(),
            data_dir: default_data_dir(),
            index_file: None,
            builds_dir: None,
            users_file: None,
            log_dir: None,
            realm: DEFAULT_REALM.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".symserve")
}

impl ServerConfig {
    /// Loads the config file if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SymbolServerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(listen) = lookup(LISTEN_ENV) {
            self.listen = listen;
        }
        if let Some(prefix) = lookup(PREFIX_ENV) {
            self.app_prefix = prefix;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.app_prefix.starts_with('/') || !self.app_prefix.ends_with('/') {
            return Err(SymbolServerError::Config(format!(
                "app_prefix must start and end with '/', got {:?}",
                self.app_prefix
            )));
        }
        if self.app_prefix.len() < 2 {
            return Err(SymbolServerError::Config(
                "app_prefix must name a path below the root".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(SymbolServerError::Config(
                "chunk_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn index_file(&self) -> PathBuf {
        self.index_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("index.jsonl"))
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.builds_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("builds"))
    }

    pub fn users_file(&self) -> PathBuf {
        self.users_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("users.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }
}
