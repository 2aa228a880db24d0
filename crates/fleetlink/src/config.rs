//! CLI-side configuration: `--config` path resolution and flag overrides
//! layered on top of `fleetlink_config`.

use std::path::PathBuf;

use clap::ValueEnum;

use fleetlink_config::Config;
use fleetlink_core::{MergeOptions, MixedNamingPolicy, TxnOptions};

use crate::cli::{ColorMode, GlobalOpts, MergeArgs, MixedNaming, OutputFormat};
use crate::error::CliError;

/// `--config`, else the shared resolution (`FLEETLINK_CONFIG`, platform dir).
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fleetlink_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(fleetlink_config::load_config_from(&config_path(global))?)
}

pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    match global.output {
        Some(format) => Ok(format),
        None => parse_setting("defaults.output", &cfg.defaults.output),
    }
}

pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> Result<ColorMode, CliError> {
    match global.color {
        Some(mode) => Ok(mode),
        None => parse_setting("defaults.color", &cfg.defaults.color),
    }
}

fn parse_setting<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// `[merge]` settings with the merge command's overrides applied.
pub fn merge_options(args: &MergeArgs, cfg: &Config) -> (MergeOptions, TxnOptions) {
    let mut merge = cfg.merge.to_merge_options();
    if let Some(mode) = args.mixed_naming {
        merge.mixed_naming = match mode {
            MixedNaming::FirstDevice => MixedNamingPolicy::FirstDevice,
            MixedNaming::Skip => MixedNamingPolicy::Skip,
        };
    }

    let mut txn = cfg.merge.to_txn_options();
    if let Some(n) = args.max_attempts {
        txn.max_attempts = n;
    }
    (merge, txn)
}
