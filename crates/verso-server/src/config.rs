//! Runtime server configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Settings layered from `config.toml` and `VERSO_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// SQLite database file; `:memory:` keeps everything in memory.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5233 }

fn default_store_path() -> PathBuf { PathBuf::from("verso.db") }

impl ServerConfig {
  /// Load settings from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
    ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(::config::Environment::with_prefix("VERSO"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn is_in_memory(&self) -> bool { self.store_path == Path::new(":memory:") }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
