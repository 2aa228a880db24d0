//! Config subcommand handlers.

use fleetlink_config::{Config, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path(global);

    match args.command {
        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let format = config::output_format(global, &cfg)?;
            let out = output::render_single(format, &cfg, |c| {
                let body = toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}"));
                format!("# {}\n{body}", path.display())
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            save_config(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("✓ Wrote default configuration to {}", path.display());
            }
            Ok(())
        }
    }
}
