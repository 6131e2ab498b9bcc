//! `config` command: inspect the resolved agent configuration.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let resolved = config::load_config()?;
            let rendered = toml::to_string_pretty(&resolved).map_err(|err| CliError::Config {
                message: format!("failed to render configuration: {err}"),
                path: config::config_path().display().to_string(),
            })?;
            print!("{rendered}");
        }
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
        }
    }
    Ok(())
}
