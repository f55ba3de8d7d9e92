//! Path resolution for mzform
//!
//! # Environment Variables
//!
//! - `MZFORM_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `MZFORM_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/mzform` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\mzform`
//!    - macOS/Linux: `~/.config/mzform`
//!
//! The state file has no global location: it sits next to the manifest it
//! belongs to, so one machine can manage several catalogs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "MZFORM_CONFIG_DIR";

/// Get the mzform config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("mzform");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("mzform"));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("mzform"))
}

/// Default provider config file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// State file that belongs to a manifest: `mzform.toml` -> `mzform.state.toml`
pub fn state_file_for(manifest: &Path) -> PathBuf {
    let stem = manifest
        .file_stem()
        .map_or_else(|| "mzform".into(), |s| s.to_string_lossy().into_owned());
    manifest.with_file_name(format!("{stem}.state.toml"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
