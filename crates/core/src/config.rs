//! Environment-derived settings for the watch and build commands.

use crate::error::{Result, ScadwatchError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MODELS_DIR: &str = "models";
pub const INDEX_FILE_NAME: &str = "README.md";

pub const DEFAULT_COMPILER: &str = "openscad";
pub const DEFAULT_IMAGE_SIZE: ImageSize = ImageSize {
    width: 800,
    height: 600,
};
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Parses `W,H`.
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.trim().split_once(',')?;
        let width = w.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        let height = h.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
        Some(Self { width, height })
    }

    /// Value of the compiler's `--imgsize` flag.
    pub fn flag(&self) -> String {
        format!("{},{}", self.width, self.height)
    }
}

/// How the mesh artifact's compiler process is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshMode {
    /// Wait for exit; a nonzero status fails the build.
    #[default]
    Await,
    /// Spawn and move on. The build reports success once the process starts.
    Detached,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub root: PathBuf,
    pub compiler: String,
    pub image_size: ImageSize,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub force_poll: bool,
    pub dimension_overlay: bool,
    pub concurrency: usize,
    pub mesh_mode: MeshMode,
}

impl WatchConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compiler: DEFAULT_COMPILER.to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            force_poll: false,
            dimension_overlay: false,
            concurrency: DEFAULT_CONCURRENCY,
            mesh_mode: MeshMode::Await,
        }
    }

    /// Reads the process environment, loading `.env` from the working
    /// directory first when present.
    pub fn from_env(root: impl Into<PathBuf>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(root, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(root: impl Into<PathBuf>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(root);

        if let Some(cmd) = lookup("OPENSCAD_CMD")
            .or_else(|| lookup("openscad_path"))
            .filter(|v| !v.trim().is_empty())
        {
            config.compiler = cmd;
        }

        if let Some(raw) = lookup("PREVIEW_IMGSIZE") {
            config.image_size = ImageSize::parse(&raw).ok_or_else(|| {
                ScadwatchError::Config(format!("PREVIEW_IMGSIZE: expected W,H, got {raw:?}"))
            })?;
        }

        if let Some(ms) = parse_number::<u64>(&lookup, "WATCH_DEBOUNCE_MS")? {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number::<u64>(&lookup, "WATCH_POLL_INTERVAL")? {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(n) = parse_number::<usize>(&lookup, "BUILD_CONCURRENCY")? {
            config.concurrency = n.max(1);
        }

        if let Some(flag) = parse_flag(&lookup, "WATCH_FORCE_POLL")? {
            config.force_poll = flag;
        }
        if let Some(flag) = parse_flag(&lookup, "PREVIEW_DIMENSIONS")? {
            config.dimension_overlay = flag;
        }
        if let Some(flag) = parse_flag(&lookup, "MESH_DETACHED")? {
            config.mesh_mode = if flag {
                MeshMode::Detached
            } else {
                MeshMode::Await
            };
        }

        Ok(config)
    }

    pub fn models_root(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        index_path_for(&self.models_root())
    }
}

pub fn index_path_for(models_root: &Path) -> PathBuf {
    models_root.join(INDEX_FILE_NAME)
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            let message = format!("{key}: expected a number, got {raw:?}");
            Err(ScadwatchError::Config(message))
        }
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(ScadwatchError::Config(format!(
            "{key}: expected on/off, got {raw:?}"
        ))),
    }
}
