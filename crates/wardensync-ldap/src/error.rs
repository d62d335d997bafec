//! Directory error types

use thiserror::Error;

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Invalid directory settings: {0}")]
    InvalidSettings(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Failed to connect to directory server: {0}")]
    Connect(String),

    #[error("Bind as '{dn}' failed with code {rc}: {message}")]
    Bind { dn: String, rc: u32, message: String },

    #[error("Directory search failed: {0}")]
    Search(String),
}

impl From<DirectoryError> for wardensync_core::Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidSettings(_) | DirectoryError::Tls(_) => {
                wardensync_core::Error::Configuration(err.to_string())
            }
            DirectoryError::Connect(_) | DirectoryError::Bind { .. } | DirectoryError::Search(_) => {
                wardensync_core::Error::Connectivity(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: wardensync_core::Error = DirectoryError::Tls("bad pem".to_string()).into();
        assert_eq!(err.kind(), "configuration");

        let err: wardensync_core::Error = DirectoryError::Bind {
            dn: "cn=sync,dc=local".to_string(),
            rc: 49,
            message: "invalid credentials".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "connectivity");
        assert!(err.to_string().contains("code 49"));
    }
}
