use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use catalog_client::ClientConfig;
use shared::types::DesiredDefinition;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub endpoints: Vec<DesiredDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Appended to every request, e.g. `stale = ""` for stale reads
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Scopes which catalog entries this run owns
    pub tags: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
    /// Give up on the whole run after this long
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            params: BTreeMap::new(),
        }
    }
}

impl CatalogConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.url.clone(),
            params: self
                .params
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}
