//! Shared configuration for fleetlink tools.
//!
//! TOML file layered over built-in defaults and `FLEETLINK_` environment
//! variables, plus translation into `fleetlink_core` option types. The CLI
//! adds flag-aware wrappers on top.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetlink_core::{MergeOptions, MixedNamingPolicy, TxnOptions};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FLEETLINK_CONFIG";

const ENV_PREFIX: &str = "FLEETLINK_";

const OUTPUT_FORMATS: &[&str] = &["table", "json", "json-compact", "yaml"];
const COLOR_MODES: &[&str] = &["auto", "always", "never"];
const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Presentation defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    /// Reconciliation tuning.
    #[serde(default)]
    pub merge: MergeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            log_level: default_log_level(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_log_level() -> String {
    "warn".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeSettings {
    /// Total transaction attempts per machine, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How to name-repair snapshots mixing named and nameless interfaces.
    #[serde(default)]
    pub mixed_naming: MixedNamingPolicy,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            mixed_naming: MixedNamingPolicy::default(),
        }
    }
}

fn default_max_attempts() -> u32 {
    TxnOptions::default().max_attempts
}

impl MergeSettings {
    pub fn to_merge_options(&self) -> MergeOptions {
        MergeOptions {
            mixed_naming: self.mixed_naming,
        }
    }

    pub fn to_txn_options(&self) -> TxnOptions {
        TxnOptions {
            max_attempts: self.max_attempts,
        }
    }
}

impl Config {
    /// Reject values the tools cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        one_of("defaults.output", &self.defaults.output, OUTPUT_FORMATS)?;
        one_of("defaults.color", &self.defaults.color, COLOR_MODES)?;
        one_of("defaults.log_level", &self.defaults.log_level, LOG_LEVELS)?;
        if self.merge.max_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "merge.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::Validation {
        field: field.into(),
        reason: format!("{value:?} is not one of {}", allowed.join(", ")),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `FLEETLINK_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "fleetlink", "fleetlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is not an
/// error; defaults and environment still apply.
///
/// Nested keys are separated by a double underscore:
/// `FLEETLINK_MERGE__MAX_ATTEMPTS=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
