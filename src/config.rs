use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_DOC_ROOT: &str = "www";
const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Process-wide server configuration.
///
/// Built once at startup and never mutated afterwards; connection workers
/// receive it (or values derived from it) through an `Arc`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Read deadline re-armed before every request, in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// Directory beneath which every served file must reside.
    #[serde(default = "default_doc_root")]
    pub doc_root: PathBuf,
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_doc_root() -> PathBuf {
    PathBuf::from(DEFAULT_DOC_ROOT)
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            doc_root: default_doc_root(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// `LANTERN_CONFIG` names an optional YAML file; `LISTEN` and `DOC_ROOT`
    /// override the corresponding values afterwards.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], with environment access supplied by the caller.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("LANTERN_CONFIG") {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(addr) = lookup("LISTEN") {
            cfg.server.listen_addr = addr;
        }
        if let Some(root) = lookup("DOC_ROOT") {
            cfg.static_files.doc_root = PathBuf::from(root);
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.server.read_timeout_secs)
    }

    /// Checks the settings that must hold before the server starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        let root = &self.static_files.doc_root;
        let meta = std::fs::metadata(root)
            .with_context(|| format!("document root {} does not exist", root.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("document root {} is not a directory", root.display());
        }
        if self.server.read_timeout_secs == 0 {
            anyhow::bail!("read timeout must be at least one second");
        }
        Ok(())
    }
}
