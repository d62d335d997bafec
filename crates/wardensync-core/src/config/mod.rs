//! Configuration for Wardensync
//!
//! Everything is read from process environment variables. The whole
//! configuration is re-read at the start of each cycle so edits to an
//! environment file take effect without a restart.

mod orgs;

pub use orgs::{OrgConfigSet, OrganizationConfig, RejectReason, RejectedConfig};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::types::{DirectoryQuery, VaultCredentials};
use crate::{
    Error, Result, DEFAULT_DISABLED_ATTRIBUTE, DEFAULT_DISABLED_VALUES, DEFAULT_GROUP_ATTRIBUTE,
    DEFAULT_LDAP_HOST, DEFAULT_MAIL_ATTRIBUTE, DEFAULT_VAULT_URL,
};

/// Default directory operation timeout in seconds
pub const DEFAULT_LDAP_TIMEOUT_SECS: u64 = 10;

/// Default vault request timeout in seconds
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 30;

/// Prefix some vault UIs show in front of organization ids
pub const ORG_ID_PREFIX: &str = "organization.";

/// Snapshot of the environment keyed by variable name
pub(crate) type Vars = BTreeMap<String, String>;

/// Truthy environment values: `1`, `true`, `yes`, `on` in any case
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn raw<'a>(vars: &'a Vars, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str)
}

/// Trimmed value, `None` when unset or blank
pub(crate) fn non_empty(vars: &Vars, key: &str) -> Option<String> {
    raw(vars, key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn flag(vars: &Vars, key: &str, default: bool) -> bool {
    raw(vars, key).map(is_truthy).unwrap_or(default)
}

fn seconds(vars: &Vars, key: &str, default: u64) -> Result<u64> {
    match non_empty(vars, key) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|_| {
            Error::Configuration(format!(
                "{} must be a whole number of seconds, got '{}'",
                key, value
            ))
        }),
    }
}

pub(crate) fn strip_org_prefix(org_id: &str) -> String {
    let org_id = org_id.trim();
    org_id.strip_prefix(ORG_ID_PREFIX).unwrap_or(org_id).to_string()
}

/// Directory connection and query settings
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// `ldap://` or `ldaps://` URL
    pub host: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    pub object_type: Option<String>,
    pub user_groups: Option<String>,
    pub group_attribute: String,
    pub filter: Option<String>,
    pub mail_attribute: String,
    pub disabled_attribute: Option<String>,
    pub disabled_values: Vec<String>,
    pub missing_is_disabled: bool,
    pub start_tls: bool,
    pub tls_verify: bool,
    pub ca_file: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LDAP_HOST.to_string(),
            bind_dn: String::new(),
            bind_password: String::new(),
            base_dn: String::new(),
            object_type: None,
            user_groups: None,
            group_attribute: DEFAULT_GROUP_ATTRIBUTE.to_string(),
            filter: None,
            mail_attribute: DEFAULT_MAIL_ATTRIBUTE.to_string(),
            disabled_attribute: Some(DEFAULT_DISABLED_ATTRIBUTE.to_string()),
            disabled_values: DEFAULT_DISABLED_VALUES.iter().map(|v| v.to_string()).collect(),
            missing_is_disabled: false,
            start_tls: false,
            tls_verify: true,
            ca_file: None,
            timeout_secs: DEFAULT_LDAP_TIMEOUT_SECS,
        }
    }
}

impl DirectoryConfig {
    fn from_vars(vars: &Vars) -> Result<Self> {
        let defaults = Self::default();

        // Unset keeps the default attribute, set-but-empty turns lock detection off
        let disabled_attribute = match raw(vars, "LDAP_DISABLED_ATTRIBUTE") {
            None => defaults.disabled_attribute,
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
        };

        let disabled_values: Vec<String> = raw(vars, "LDAP_DISABLED_VALUES")
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            host: non_empty(vars, "LDAP_HOST").unwrap_or(defaults.host),
            bind_dn: non_empty(vars, "LDAP_BIND_DN").unwrap_or_default(),
            bind_password: raw(vars, "LDAP_BIND_PASSWORD").unwrap_or("").to_string(),
            base_dn: non_empty(vars, "LDAP_BASE_DN").unwrap_or_default(),
            object_type: non_empty(vars, "LDAP_OBJECT_TYPE"),
            user_groups: non_empty(vars, "LDAP_USER_GROUPS"),
            group_attribute: non_empty(vars, "LDAP_GROUP_ATTRIBUTE")
                .unwrap_or(defaults.group_attribute),
            filter: non_empty(vars, "LDAP_FILTER"),
            mail_attribute: non_empty(vars, "LDAP_MAIL_FIELD").unwrap_or(defaults.mail_attribute),
            disabled_attribute,
            disabled_values: if disabled_values.is_empty() {
                defaults.disabled_values
            } else {
                disabled_values
            },
            missing_is_disabled: flag(vars, "LDAP_MISSING_IS_DISABLED", false),
            start_tls: flag(vars, "LDAP_STARTTLS", false),
            tls_verify: !flag(vars, "IGNORE_LDAPS_CERT", false),
            ca_file: non_empty(vars, "LDAP_CA_FILE"),
            timeout_secs: seconds(vars, "LDAP_TIMEOUT", DEFAULT_LDAP_TIMEOUT_SECS)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory query for the configured scope
    pub fn query(&self) -> DirectoryQuery {
        DirectoryQuery {
            object_type: self.object_type.clone(),
            groups: self.user_groups.clone(),
            additional_filter: self.filter.clone(),
            group_attribute: self.group_attribute.clone(),
            mail_attribute: self.mail_attribute.clone(),
            disabled_attribute: self.disabled_attribute.clone(),
            disabled_values: self.disabled_values.clone(),
            missing_is_disabled: self.missing_is_disabled,
        }
    }

    /// Whether a group list or a raw filter narrows the directory scope
    pub fn has_scope(&self) -> bool {
        self.user_groups.is_some() || self.filter.is_some()
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***")
            .field("base_dn", &self.base_dn)
            .field("object_type", &self.object_type)
            .field("user_groups", &self.user_groups)
            .field("group_attribute", &self.group_attribute)
            .field("filter", &self.filter)
            .field("mail_attribute", &self.mail_attribute)
            .field("disabled_attribute", &self.disabled_attribute)
            .field("disabled_values", &self.disabled_values)
            .field("missing_is_disabled", &self.missing_is_disabled)
            .field("start_tls", &self.start_tls)
            .field("tls_verify", &self.tls_verify)
            .field("ca_file", &self.ca_file)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Vault endpoint and service account
#[derive(Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,

    /// Organization to manage; empty selects auto-discovery
    pub org_id: String,

    pub tls_verify: bool,
    pub timeout_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_VAULT_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            org_id: String::new(),
            tls_verify: true,
            timeout_secs: DEFAULT_VAULT_TIMEOUT_SECS,
        }
    }
}

impl VaultConfig {
    fn from_vars(vars: &Vars) -> Result<Self> {
        Ok(Self {
            url: non_empty(vars, "VW_URL").unwrap_or_else(|| DEFAULT_VAULT_URL.to_string()),
            client_id: non_empty(vars, "VW_USER_CLIENT_ID").unwrap_or_default(),
            client_secret: raw(vars, "VW_USER_CLIENT_SECRET").unwrap_or("").trim().to_string(),
            org_id: strip_org_prefix(raw(vars, "VW_ORG_ID").unwrap_or("")),
            tls_verify: !flag(vars, "IGNORE_VW_CERT", false),
            timeout_secs: seconds(vars, "VW_TIMEOUT", DEFAULT_VAULT_TIMEOUT_SECS)?,
        })
    }

    pub fn credentials(&self) -> VaultCredentials {
        VaultCredentials {
            url: self.url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            tls_verify: self.tls_verify,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("org_id", &self.org_id)
            .field("tls_verify", &self.tls_verify)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Full configuration for one sync cycle
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub directory: DirectoryConfig,
    pub vault: VaultConfig,

    /// Keep the service account's own email out of revocations
    pub prevent_self_lock: bool,

    /// Strict mode: revoke active members that are not enabled directory users
    pub users_only: bool,

    pub multi_org_mode: bool,

    /// Per-organization configs; only populated in multi-organization mode
    pub organizations: OrgConfigSet,
}

impl SyncConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let directory = DirectoryConfig::from_vars(&vars)?;
        let vault = VaultConfig::from_vars(&vars)?;
        let multi_org_mode = flag(&vars, "MULTI_ORG_MODE", false);
        let organizations = if multi_org_mode {
            OrgConfigSet::parse(&vars, vault.timeout_secs)
        } else {
            OrgConfigSet::default()
        };

        Ok(Self {
            directory,
            vault,
            prevent_self_lock: flag(&vars, "PREVENT_SELF_LOCK", true),
            users_only: flag(&vars, "LDAP_USERS_ONLY", false),
            multi_org_mode,
            organizations,
        })
    }
}
