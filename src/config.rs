use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecyclePolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub log_level: String,
    /// Per-request deadline; unset means requests are never cut short.
    pub request_timeout_secs: Option<u64>,
    pub lifecycle: LifecyclePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database_path: PathBuf::from("deepwork.sqlite3"),
            log_level: "info".into(),
            request_timeout_secs: None,
            lifecycle: LifecyclePolicy::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.lifecycle
            .validate()
            .map_err(|err| anyhow!("invalid lifecycle config: {err}"))?;
        if self.request_timeout_secs == Some(0) {
            return Err(anyhow!("request_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
