//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable holding the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "NAV_SW_ROOT";

/// Get the root directory of the navigation software, under which the `params` and `sessions`
/// directories live.
pub fn get_nav_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
