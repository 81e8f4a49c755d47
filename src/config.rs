use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ACCOUNTS_FILE_ENV: &str = "OCCLOUD_ACCOUNTS_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
}

fn default_user_agent() -> String {
    format!("occloud/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            accounts_file: None,
            default_account: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create dir {}", parent.display()))?;
        }
        let raw = toml::to_string(self).context("failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("failed to write config {}", path.display()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `OCCLOUD_ACCOUNTS_FILE`, then `accounts_file`, then the per-user default.
    pub fn accounts_path(&self) -> Result<PathBuf> {
        self.accounts_path_with(env::var_os(ACCOUNTS_FILE_ENV).map(PathBuf::from))
    }

    fn accounts_path_with(&self, env_override: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = env_override.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
        if let Some(path) = &self.accounts_file {
            return Ok(path.clone());
        }
        let base =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("unable to locate config dir"))?;
        Ok(base.join("occloud").join("accounts.toml"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = home_config_dir()
        .ok_or_else(|| anyhow::anyhow!("unable to locate config dir"))?;
    Ok(base.join("occloud").join("config.toml"))
}

/// Returns ~/.config on all platforms instead of platform-specific config dirs.
fn home_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config"))
}
