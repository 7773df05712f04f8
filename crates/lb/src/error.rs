use thiserror::Error;

/// Failure to pick a backend for one request.
///
/// Every variant is routable: the pipeline answers with a gateway-unavailable
/// style response, retries another director, or gives up. None of them is a
/// reason to tear the worker down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("director has no load balancing policy")]
    NotConfigured,

    #[error("no backend available")]
    NoBackend,

    #[error("workspace overflow: need {needed} bytes, {available} available")]
    WorkspaceOverflow { needed: usize, available: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigureError {
    #[error("{director}: LB method is already set to {policy}")]
    AlreadyConfigured {
        director: String,
        policy: &'static str,
    },

    #[error("unsupported load balancing policy: {0}")]
    UnknownPolicy(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetError {
    #[error("invalid weight {weight} for backend '{name}'")]
    InvalidWeight { name: String, weight: f64 },

    #[error("backend '{0}' is already a member")]
    Duplicate(String),

    #[error("backend '{0}' is not a member")]
    Unknown(String),
}
