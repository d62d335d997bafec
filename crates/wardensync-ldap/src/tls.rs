//! TLS client configuration for a custom CA bundle

use rustls_pemfile::certs;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use crate::error::{DirectoryError, DirectoryResult};

/// Build a rustls client config trusting only the CAs in `path`
pub fn load_ca_config(path: &str) -> DirectoryResult<Arc<rustls::ClientConfig>> {
    let file = File::open(path)
        .map_err(|e| DirectoryError::Tls(format!("Failed to open CA file {}: {}", path, e)))?;
    let der = certs(&mut BufReader::new(file))
        .map_err(|e| DirectoryError::Tls(format!("Failed to parse CA file {}: {}", path, e)))?;

    let mut roots = rustls::RootCertStore::empty();
    let (added, _ignored) = roots.add_parsable_certificates(&der);
    if added == 0 {
        return Err(DirectoryError::Tls(format!(
            "No usable certificates in CA file {}",
            path
        )));
    }

    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = load_ca_config("/nonexistent/ca.pem").unwrap_err();
        assert!(matches!(err, DirectoryError::Tls(_)));
    }

    #[test]
    fn test_file_without_certificates() {
        let path = std::env::temp_dir().join(format!("wardensync-empty-ca-{}.pem", std::process::id()));
        std::fs::write(&path, "not a certificate\n").unwrap();
        let err = load_ca_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("No usable certificates"));
        let _ = std::fs::remove_file(path);
    }
}
