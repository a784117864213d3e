use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodenavConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_ms: Option<u64>,
    /// Moniker schemes listed most preferred first
    pub scheme_priority: Option<Vec<String>>,
    /// Local git checkouts used for commit diffs, one per repository id
    #[serde(default)]
    pub repositories: Vec<RepositoryCheckout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryCheckout {
    pub id: i64,
    pub path: PathBuf,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codenav.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CodenavConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CodenavConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}
