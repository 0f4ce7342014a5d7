//! Home directory paths for mops.
//!
//! Everything lives under a single dot-directory in the user's home, which
//! `MOPS_HOME` can override.

use std::path::PathBuf;

/// Get the mops home directory.
///
/// Returns `$MOPS_HOME` if set, otherwise `~/.mops`.
///
/// # Examples
///
/// ```
/// use mops_paths::home_dir;
///
/// let home = home_dir();
/// let loader = home.join("loader.toml");
/// ```
pub fn home_dir() -> PathBuf {
    if let Ok(home) = std::env::var("MOPS_HOME") {
        PathBuf::from(home)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".mops")
    } else {
        PathBuf::from(".mops")
    }
}

/// Get the user plugin directory (`<home>/plugins`).
pub fn plugin_dir() -> PathBuf {
    home_dir().join("plugins")
}

/// Get the host's loader configuration file (`<home>/loader.toml`).
pub fn loader_config_file() -> PathBuf {
    home_dir().join("loader.toml")
}
