use ::config::MerchantConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON file holding the auth token and scan status
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Prometheus exporter port; metrics are disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Merchant API and dashboard settings
    #[serde(default)]
    pub merchant: MerchantConfig,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("monitor-store.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            metrics_port: None,
            merchant: MerchantConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.merchant.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
