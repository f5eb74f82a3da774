use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "promptshade";
const APPLICATION: &str = "promptshade";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    /// Uses `config_override` (from `--config-dir` or `PROMPTSHADE_CONFIG_DIR`)
    /// when non-empty, otherwise the platform config directory.
    pub fn discover(config_override: Option<&Path>) -> Result<Self> {
        if let Some(dir) = config_override.filter(|dir| !dir.as_os_str().is_empty()) {
            return Ok(Self::from_raw(dir.to_path_buf()));
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self::from_raw(project_dirs.config_dir().to_path_buf()))
    }

    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}
