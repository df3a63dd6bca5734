//! Config command: inspect the configuration decode runs would use

use anyhow::Result;
use colored::*;

use geisli::config_search_paths;
use geisli_cli::ConfigCommands;

use super::util::load_file_config;

pub fn run(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show { config } => {
            let resolved = load_file_config(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&resolved)?);
        }
        ConfigCommands::Path => {
            for path in config_search_paths() {
                let marker = if path.exists() {
                    "found".green()
                } else {
                    "missing".dimmed()
                };
                println!("{}  ({})", path.display(), marker);
            }
        }
    }
    Ok(())
}
