//! `newsdeck config`: inspect and initialize the config file.

use newsdeck_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::resolve_path(global);
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            // Validate so `show` surfaces the same errors a data command would.
            cfg.to_core_config()?;
            cfg.api_endpoints()?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(newsdeck_config::ConfigError::from)?,
                _ => output::render_single(&global.output, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            newsdeck_config::save_config_to(&Config::default(), &path)?;
            tracing::info!(path = %path.display(), "wrote config");
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }
    }
}
