//! Error types for Wardensync

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration; fatal for the affected organization only
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Directory or vault could not be reached; retried by the run loop
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A single vault call was rejected
    #[error("API error{}: {message}", status_suffix(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// At least one action failed while the others were applied
    #[error("Partial failure: {}", .0.join("; "))]
    PartialFailure(Vec<String>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" [HTTP {}]", code),
        None => String::new(),
    }
}

impl Error {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    /// Short label used for logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Connectivity(_) => "connectivity",
            Error::Api { .. } => "api",
            Error::PartialFailure(_) => "partial_failure",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Other(_) => "internal",
        }
    }
}
