//! CLI command implementations.

pub mod build;
pub mod check;

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use tagpress_core::Config;

/// Load the site configuration (with `TAGPRESS__*` environment overrides)
/// and return it with the site root, the directory holding the file.
pub(crate) fn load_site(config_path: &Path) -> Result<(Config, PathBuf)> {
    let config = Config::load_with_env(config_path)
        .wrap_err_with(|| format!("failed to load configuration {}", config_path.display()))?;
    let root = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    tracing::debug!(?config, root = %root.display(), "loaded configuration");
    Ok((config, root))
}
