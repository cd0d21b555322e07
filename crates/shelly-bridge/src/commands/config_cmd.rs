//! `config path` and `config show`.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&util::config_file(global).display().to_string());
            Ok(())
        }
        ConfigCommand::Show => {
            let mut config = util::load(global)?;
            util::apply_overrides(&mut config, global)?;
            // Never echo plaintext passwords.
            for device in &mut config.devices {
                if device.password.is_some() {
                    device.password = Some("********".into());
                }
            }

            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&config)
                    .map_err(|e| CliError::Render(e.to_string()))?,
                format => output::render_single(format, &config, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out);
            Ok(())
        }
    }
}
