use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `briefly.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BrieflyConfig {
    pub database: Option<String>,
    /// Days to keep briefings; absent means never delete
    pub retention_days: Option<i64>,
}

impl BrieflyConfig {
    /// `--database` flag, then the config value, then the default under `base`
    pub fn resolve_database(&self, flag: Option<&Path>, base: &Path) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(base))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("briefly.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".briefly").join("briefly.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BrieflyConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BrieflyConfig = toml::from_str(&contents)?;
    if let Some(days) = config.retention_days {
        if days < 1 {
            anyhow::bail!(
                "retention_days in {} must be at least 1 (remove it to never delete)",
                path.display()
            );
        }
    }
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &BrieflyConfig, force: bool) -> anyhow::Result<()> {
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
