use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use shadergen::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

use crate::cli::SettingsArgs;
use crate::paths::AppPaths;

const DEFAULT_SURFACE_SIZE: (u32, u32) = (800, 600);

/// Optional settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub size: Option<String>,
    pub fps: Option<f32>,
    pub shader: Option<PathBuf>,
}

impl FileConfig {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file at {}", path.display()))
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub timeout: Duration,
    pub surface_size: (u32, u32),
    pub target_fps: Option<f32>,
    pub shader: Option<PathBuf>,
}

impl Settings {
    /// Command-line and environment values win over the file, which wins over
    /// built-in defaults.
    pub fn resolve(args: &SettingsArgs, file: FileConfig) -> Result<Self> {
        let endpoint = args
            .endpoint
            .clone()
            .or(file.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = args
            .timeout
            .or(file.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let surface_size = match args.size.as_deref().or(file.size.as_deref()) {
            Some(raw) => parse_surface_size(raw)
                .with_context(|| format!("invalid surface size '{raw}'"))?,
            None => DEFAULT_SURFACE_SIZE,
        };
        let target_fps = args.fps.or(file.fps).filter(|fps| *fps > 0.0);
        let shader = args.shader.clone().or(file.shader);

        Ok(Self {
            endpoint,
            timeout,
            surface_size,
            target_fps,
            shader,
        })
    }
}

/// Resolves the config directory, reads the optional file and merges it with
/// `args`.
pub fn load(args: &SettingsArgs) -> Result<Settings> {
    let paths = AppPaths::discover(args.config_dir.as_deref())?;
    let file = FileConfig::load_or_default(&paths.config_file())?;
    let settings = Settings::resolve(args, file)?;
    tracing::debug!(
        config = %paths.config_file().display(),
        endpoint = %settings.endpoint,
        timeout_secs = settings.timeout.as_secs(),
        size = ?settings.surface_size,
        fps = ?settings.target_fps,
        "resolved promptshade settings"
    );
    Ok(settings)
}

pub fn parse_surface_size(raw: &str) -> Result<(u32, u32)> {
    let trimmed = raw.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}
