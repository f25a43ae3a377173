//! Configuration CLI commands

use crate::config::AppConfig;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML, credentials hidden
    Show,

    /// Load and validate the configuration, then exit
    Check,
}

/// Handle config commands
pub fn handle_config_command(command: ConfigCommands, config: &AppConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => print!("{}", config.to_redacted_toml()?),
        ConfigCommands::Check => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
