//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | Windows | Linux |
//! |---------|---------|-------|
//! | Config | `%APPDATA%\schedctl\` | `~/.config/schedctl/` |
//!
//! `SCHEDCTL_CONFIG_DIR` overrides [`config_dir`] for tests and custom deployments.

use std::path::PathBuf;

/// Environment variable overriding [`config_dir`].
pub const CONFIG_DIR_ENV: &str = "SCHEDCTL_CONFIG_DIR";

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/schedctl/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("schedctl"))
        .unwrap_or_else(|| std::env::temp_dir().join("schedctl-config"))
}
