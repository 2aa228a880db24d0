//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod machines;
pub mod merge;
pub mod util;

use fleetlink_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a model-file command to the appropriate handler.
pub fn dispatch(cmd: Command, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    match cmd {
        Command::Merge(args) => merge::handle(&args, global, cfg),
        Command::Machines(args) => machines::handle(&args, global, cfg),
        Command::Devices(args) => devices::handle(&args, global, cfg),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
