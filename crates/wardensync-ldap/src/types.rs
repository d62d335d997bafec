//! LDAP connection settings

use std::fmt;
use std::time::Duration;
use wardensync_core::config::DirectoryConfig;

/// Connection parameters for the directory server
#[derive(Clone)]
pub struct LdapSettings {
    /// LDAP server URL (ldap:// or ldaps://)
    /// Example: "ldaps://ipa.example.com:636"
    pub server_url: String,

    /// Upgrade a plain connection with STARTTLS
    pub start_tls: bool,

    /// Verify the server certificate
    pub tls_verify: bool,

    /// PEM bundle of trusted CAs, replaces the built-in roots when set
    pub ca_file: Option<String>,

    /// Service account DN; empty binds anonymously
    pub bind_dn: String,

    pub bind_password: String,

    /// Base DN for user searches
    pub base_dn: String,

    /// Connection and operation timeout
    pub timeout: Duration,
}

impl LdapSettings {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            server_url: config.host.clone(),
            start_tls: config.start_tls,
            tls_verify: config.tls_verify,
            ca_file: config.ca_file.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            base_dn: config.base_dn.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn is_ldaps(&self) -> bool {
        self.server_url.to_ascii_lowercase().starts_with("ldaps://")
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        let url = self.server_url.to_ascii_lowercase();
        if !url.starts_with("ldap://") && !url.starts_with("ldaps://") {
            return Err(format!(
                "Server URL must start with ldap:// or ldaps://, got '{}'",
                self.server_url
            ));
        }
        if self.base_dn.trim().is_empty() {
            return Err("Base DN is required".to_string());
        }
        if self.start_tls && self.is_ldaps() {
            return Err("STARTTLS cannot be combined with an ldaps:// URL".to_string());
        }
        if self.bind_dn.is_empty() != self.bind_password.is_empty() {
            return Err("Bind DN and bind password must be set together".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSettings")
            .field("server_url", &self.server_url)
            .field("start_tls", &self.start_tls)
            .field("tls_verify", &self.tls_verify)
            .field("ca_file", &self.ca_file)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***")
            .field("base_dn", &self.base_dn)
            .field("timeout", &self.timeout)
            .finish()
    }
}
