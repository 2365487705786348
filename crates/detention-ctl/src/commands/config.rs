//! `detention-ctl config validate`

use std::path::Path;

use crate::{load_config, output, ConfigCommands};

pub(crate) fn handle_config_command(
    cmd: ConfigCommands,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Validate => {
            let config = load_config(config_path)?;
            match config_path {
                Some(path) => output::success(format!("{} is valid", path.display())),
                None => output::success("Configuration is valid (defaults and environment)"),
            }
            output::blank();
            output::plain(toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
