//! XDG directory utilities for audioscribe.

use std::path::PathBuf;

use anyhow::{Context, Result};
use xdg::BaseDirectories;

const APP_NAME: &str = "audioscribe";

fn base_dirs() -> BaseDirectories {
    BaseDirectories::with_prefix(APP_NAME)
}

/// Return the XDG config directory (no creation - config may not exist yet).
/// `~/.config/audioscribe/`
pub fn config_dir() -> Result<PathBuf> {
    base_dirs()
        .get_config_home()
        .context("Could not determine config directory (HOME not set?)")
}

/// Return the XDG data directory, creating it if needed.
/// `~/.local/share/audioscribe/`
pub fn data_dir() -> Result<PathBuf> {
    let dir = base_dirs()
        .get_data_home()
        .context("Could not determine data directory (HOME not set?)")?;
    std::fs::create_dir_all(&dir).context("Failed to create data directory")?;
    Ok(dir)
}

/// Return the XDG state directory, creating it if needed.
/// `~/.local/state/audioscribe/`
pub fn state_dir() -> Result<PathBuf> {
    let dir = base_dirs()
        .get_state_home()
        .context("Failed to get XDG state directory (HOME not set?)")?;
    std::fs::create_dir_all(&dir).context("Failed to create state directory")?;
    Ok(dir)
}

/// Directory where downloaded model weights are stored.
/// `~/.local/share/audioscribe/models/`
pub fn models_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("models"))
}

/// Directory where playable copies of uploaded audio are kept.
/// `~/.local/state/audioscribe/sources/`
pub fn sources_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("sources"))
}

/// Diagnostics log file path.
/// `~/.local/state/audioscribe/audioscribe.log`
pub fn log_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("audioscribe.log"))
}
