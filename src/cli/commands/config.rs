//! Config command implementation.

use crate::cli::ConfigAction;
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", settings.to_toml()?);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
