use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::FilterPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IntelhubConfig {
    pub database: Option<String>,
    /// Fail filtered reads on invalid column names instead of dropping them
    #[serde(default)]
    pub strict_filters: bool,
    /// Legacy credentials file consumed by `migrate-users`
    pub users_file: Option<String>,
}

impl IntelhubConfig {
    pub fn filter_policy(&self) -> FilterPolicy {
        if self.strict_filters {
            FilterPolicy::Strict
        } else {
            FilterPolicy::Permissive
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("intelhub.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".intelhub").join("intelhub.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<IntelhubConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: IntelhubConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &IntelhubConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
