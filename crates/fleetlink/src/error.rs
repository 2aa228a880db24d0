//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fleetlink_config::ConfigError;
use fleetlink_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fleetlink::not_found),
        help("Run: fleetlink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Machine {machine_id} is not alive")]
    #[diagnostic(
        code(fleetlink::not_alive),
        help("Only alive machines are reconciled; nothing was written.")
    )]
    NotAlive { machine_id: String },

    // ── Concurrency ──────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(fleetlink::conflict),
        help("Another writer changed the model. Re-run, or raise merge.max_attempts.")
    )]
    Conflict { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(fleetlink::duplicate_provider_id),
        help("Provider IDs must be unique across the whole model. Check the snapshot's provider_id values.")
    )]
    DuplicateProviderId { message: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Reconciliation failed at {context}")]
    #[diagnostic(code(fleetlink::reconcile))]
    Reconcile {
        context: String,
        #[source]
        source: Box<CliError>,
    },

    #[error("Batch rejected: {reason}")]
    #[diagnostic(code(fleetlink::rejected))]
    Rejected { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetlink::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot tell the format of {path}")]
    #[diagnostic(
        code(fleetlink::unknown_format),
        help("Use a .json, .yaml or .yml extension.")
    )]
    UnknownFormat { path: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(fleetlink::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(fleetlink::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error("Could not read {path}")]
    #[diagnostic(code(fleetlink::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {path}")]
    #[diagnostic(code(fleetlink::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(fleetlink::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(fleetlink::yaml), help("Check the YAML file contents and try again."))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NotAlive { .. } | Self::Conflict { .. } | Self::DuplicateProviderId { .. } => {
                exit_code::CONFLICT
            }
            Self::Validation { .. } | Self::UnknownFormat { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            Self::Reconcile { source, .. } => source.exit_code(),
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MachineNotFound { machine_id } => Self::NotFound {
                resource_type: "machine".into(),
                identifier: machine_id.to_string(),
                list_command: "machines --state <FILE>".into(),
            },

            CoreError::DeviceNotFound { machine_id, name } => Self::NotFound {
                resource_type: "device".into(),
                identifier: name,
                list_command: format!("devices --state <FILE> --machine {machine_id}"),
            },

            CoreError::AddressNotFound {
                machine_id,
                device,
                value,
            } => Self::NotFound {
                resource_type: "address".into(),
                identifier: format!("{value} on {device}"),
                list_command: format!("devices --state <FILE> --machine {machine_id}"),
            },

            CoreError::MachineNotAlive { machine_id } => Self::NotAlive {
                machine_id: machine_id.to_string(),
            },

            err @ (CoreError::TxnConflict { .. } | CoreError::RetriesExhausted { .. }) => {
                Self::Conflict {
                    message: err.to_string(),
                }
            }

            err @ CoreError::DuplicateProviderId { .. } => Self::DuplicateProviderId {
                message: err.to_string(),
            },

            CoreError::InvalidProviderId { value, reason } => Self::Validation {
                field: "provider_id".into(),
                reason: format!("{value:?}: {reason}"),
            },

            CoreError::InvalidModel { reason } => Self::Validation {
                field: "model".into(),
                reason,
            },

            CoreError::OperationRejected { reason } => Self::Rejected { reason },

            CoreError::Device {
                name,
                mac,
                operation,
                source,
            } => Self::Reconcile {
                context: format!("device {name:?} ({mac}) while trying to {operation}"),
                source: Box::new(Self::from(*source)),
            },

            CoreError::Address {
                device,
                value,
                operation,
                source,
            } => Self::Reconcile {
                context: format!("address {value:?} on {device:?} while trying to {operation}"),
                source: Box::new(Self::from(*source)),
            },

            CoreError::Json(e) => Self::Json(e),
            CoreError::Yaml(e) => Self::Yaml(e),
        }
    }
}
