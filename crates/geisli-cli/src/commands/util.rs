use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use geisli::{GeisliConfig, OutputFormat, load_config, load_config_from_path};

/// Load the config file given with `--config`, or search the default locations.
pub fn load_file_config(explicit: Option<&Path>) -> Result<GeisliConfig> {
    match explicit {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    }
}

/// `--model` first, then `[model] path` from the config.
pub fn resolve_model_path(cli: Option<&Path>, config: &GeisliConfig) -> Result<PathBuf> {
    cli.map(Path::to_path_buf)
        .or_else(|| config.model.path.clone())
        .ok_or_else(|| {
            anyhow!("No model given. Pass --model <file.json> or set [model] path in geisli.toml.")
        })
}

/// Parse `--format`, falling back to the config value.
pub fn resolve_format(cli: Option<&str>, fallback: OutputFormat) -> Result<OutputFormat> {
    match cli.map(str::to_ascii_lowercase).as_deref() {
        None => Ok(fallback),
        Some("text") => Ok(OutputFormat::Text),
        Some("json") => Ok(OutputFormat::Json),
        Some(other) => Err(anyhow!(
            "Unknown output format '{}'. Use 'text' or 'json'.",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_precedence() {
        let mut config = GeisliConfig::default();
        assert!(resolve_model_path(None, &config).is_err());

        config.model.path = Some(PathBuf::from("from-config.json"));
        assert_eq!(
            resolve_model_path(None, &config).unwrap(),
            PathBuf::from("from-config.json")
        );
        assert_eq!(
            resolve_model_path(Some(Path::new("cli.json")), &config).unwrap(),
            PathBuf::from("cli.json")
        );
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(None, OutputFormat::Json).unwrap(), OutputFormat::Json);
        assert_eq!(resolve_format(Some("TEXT"), OutputFormat::Json).unwrap(), OutputFormat::Text);
        assert_eq!(resolve_format(Some("json"), OutputFormat::Text).unwrap(), OutputFormat::Json);
        assert!(resolve_format(Some("yaml"), OutputFormat::Text).is_err());
    }
}
