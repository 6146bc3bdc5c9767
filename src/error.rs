//! Engine error types
//!
//! The matching core is total and never fails. Errors only exist at the
//! collaborator seams and in the workflow stage machine.

use thiserror::Error;

use crate::workflow::Stage;

/// Failure reported by a homologation lookup backend.
///
/// The readiness aggregator never propagates these; an item whose lookup
/// fails is treated as not homologated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("homologation backend unavailable: {0}")]
    Unavailable(String),
    #[error("homologation lookup timed out for '{0}'")]
    TimedOut(String),
    #[error("homologation backend returned an invalid answer: {0}")]
    Invalid(String),
}

/// Refused stage transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("vehicle {plate} is not ready to schedule")]
    NotReady { plate: String },
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error("{0:?} is the final stage")]
    AlreadyFinal(Stage),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
