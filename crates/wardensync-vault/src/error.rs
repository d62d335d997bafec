//! Vault error types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid vault URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication rejected [HTTP {status}]: {body}")]
    Auth { status: u16, body: String },

    #[error("Request rejected [HTTP {status}]: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl VaultError {
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Auth { status, .. } | VaultError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            VaultError::Decode(err.to_string())
        } else {
            VaultError::Transport(err.to_string())
        }
    }
}

impl From<VaultError> for wardensync_core::Error {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::InvalidUrl(_) | VaultError::Client(_) => {
                wardensync_core::Error::Configuration(err.to_string())
            }
            VaultError::Transport(msg) => wardensync_core::Error::Connectivity(msg),
            VaultError::Auth { status, body } | VaultError::Api { status, body } => {
                wardensync_core::Error::api(Some(status), body)
            }
            VaultError::Decode(msg) => wardensync_core::Error::api(None, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: wardensync_core::Error = VaultError::Api {
            status: 404,
            body: "Organization not found".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "API error [HTTP 404]: Organization not found");

        let err: wardensync_core::Error = VaultError::Transport("connection refused".into()).into();
        assert_eq!(err.kind(), "connectivity");

        let err: wardensync_core::Error = VaultError::InvalidUrl("nope".into()).into();
        assert_eq!(err.kind(), "configuration");
    }
}
