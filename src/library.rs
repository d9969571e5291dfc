use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::APP_NAME;

pub struct DataPaths {
    pub blobs_dir: PathBuf,
    pub context_file: PathBuf,
}

impl DataPaths {
    /// Layout under an explicit data directory. Creates the directories.
    pub fn under(data_dir: &Path) -> Result<Self> {
        let blobs_dir = data_dir.join("uploads");
        fs::create_dir_all(&blobs_dir)
            .with_context(|| format!("Failed to create uploads directory: {blobs_dir:?}"))?;
        Ok(Self {
            blobs_dir,
            context_file: data_dir.join("context.json"),
        })
    }
}

/// Compute XDG-compliant data paths, or use `data_dir` when given.
pub fn resolve_data_paths(data_dir: Option<&Path>) -> Result<DataPaths> {
    let data_dir = match data_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => std::env::current_dir()
            .context("Failed to get current directory")?
            .join(dir),
        None => dirs::data_dir()
            .context("Could not determine data directory")?
            .join(APP_NAME),
    };
    DataPaths::under(&data_dir)
}

/// Compute the XDG-compliant log file path.
/// Uses `state_dir` on platforms that have it, falls back to `cache_dir`.
pub fn resolve_log_path() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not determine state or cache directory")?;

    let log_dir = base.join(APP_NAME);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {log_dir:?}"))?;

    Ok(log_dir.join("finassist.log"))
}
