mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `-v` flags win over the configured level; `RUST_LOG` wins over both.
fn init_tracing(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "fleetlink", &mut std::io::stdout());
            Ok(())
        }

        // Config commands load (or skip) the config file themselves, so a
        // broken file can still be inspected or replaced.
        Command::Config(args) => {
            init_tracing(cli.global.verbose, "warn");
            commands::config_cmd::handle(args, &cli.global)
        }

        cmd => {
            let cfg = config::load(&cli.global)?;
            init_tracing(cli.global.verbose, &cfg.defaults.log_level);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cli.global, &cfg)
        }
    }
}
