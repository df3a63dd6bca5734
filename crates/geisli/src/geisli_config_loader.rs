use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::geisli_config::GeisliConfig;

const LOCAL_CONFIG: &str = "geisli.toml";

/// Files searched by [`load_config`], highest priority first.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(LOCAL_CONFIG)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("geisli").join("config.toml"));
    }
    paths
}

/// Load configuration with standard priority:
/// CLI flags > ./geisli.toml > ~/.config/geisli/config.toml > defaults
pub fn load_config() -> Result<GeisliConfig> {
    Ok(load_first_existing(&config_search_paths())?
        .map(|(_, config)| config)
        .unwrap_or_default())
}

/// Load from specific path.
pub fn load_config_from_path(path: &Path) -> Result<GeisliConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    let config: GeisliConfig = toml::from_str(&contents)
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    Ok(config)
}

/// First candidate that exists, with the path it came from.
///
/// A file that exists but fails to parse is an error, not a fallthrough.
pub fn load_first_existing(candidates: &[PathBuf]) -> Result<Option<(PathBuf, GeisliConfig)>> {
    for path in candidates {
        if let Some(config) = try_load_from_path(path)? {
            log::debug!("using config {}", path.display());
            return Ok(Some((path.clone(), config)));
        }
    }
    Ok(None)
}

fn try_load_from_path(path: impl AsRef<Path>) -> Result<Option<GeisliConfig>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(load_config_from_path(path)?))
    } else {
        Ok(None)
    }
}
