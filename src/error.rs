// src/error.rs

use thiserror::Error;

/// Failure kinds that abort a run. Carried inside `anyhow::Error`; callers that
/// care about the kind can `downcast_ref::<EtlError>()`.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("missing required environment variable {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("spreadsheet API unreachable or credentials rejected: {0}")]
    Connection(String),

    #[error("{table} is missing expected column(s): {}", .missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("missing required worksheet(s): {}", .0.join(", "))]
    MissingTabs(Vec<String>),

    #[error("invalid {field} for {key}: {value:?}")]
    InvalidValue {
        field: &'static str,
        key: String,
        value: String,
    },

    #[error("write to {range} failed: {reason}")]
    Write { range: String, reason: String },
}
