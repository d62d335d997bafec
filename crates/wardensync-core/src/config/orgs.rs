//! Per-organization configuration
//!
//! The bare keys form the base record (`default`). Any `<FAMILY>_<SUFFIX>`
//! key introduces a derived record that starts as a copy of the base and
//! overrides every field whose suffixed value is non-empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::{is_truthy, non_empty, strip_org_prefix, Vars, DEFAULT_VAULT_TIMEOUT_SECS};
use crate::types::VaultCredentials;
use crate::DEFAULT_VAULT_URL;

/// Config id of the record built from the bare keys
pub const BASE_CONFIG_ID: &str = "default";

static SUFFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+(_[A-Za-z0-9]+)*$").unwrap());

/// Key families that take part in per-organization overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    OrgId,
    ClientId,
    ClientSecret,
    Url,
    UserGroups,
    IgnoreCert,
}

impl Family {
    const ALL: [Family; 6] = [
        Family::OrgId,
        Family::ClientId,
        Family::ClientSecret,
        Family::Url,
        Family::UserGroups,
        Family::IgnoreCert,
    ];

    fn key(self) -> &'static str {
        match self {
            Family::OrgId => "VW_ORG_ID",
            Family::ClientId => "VW_USER_CLIENT_ID",
            Family::ClientSecret => "VW_USER_CLIENT_SECRET",
            Family::Url => "VW_URL",
            Family::UserGroups => "LDAP_USER_GROUPS",
            Family::IgnoreCert => "IGNORE_VW_CERT",
        }
    }

    /// Suffix part of `key` if it belongs to this family
    fn suffix_of(self, key: &str) -> Option<&str> {
        key.strip_prefix(self.key())?.strip_prefix('_')
    }
}

/// Settings for one managed organization
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationConfig {
    pub config_id: String,
    pub org_id: String,
    pub vw_url: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Raw group list whose enabled members belong to this organization
    pub group_filter: String,

    pub tls_verify: bool,
    pub timeout_secs: u64,
}

impl OrganizationConfig {
    pub fn credentials(&self) -> VaultCredentials {
        VaultCredentials {
            url: self.vw_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            tls_verify: self.tls_verify,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    fn base(vars: &Vars, timeout_secs: u64) -> Self {
        Self {
            config_id: BASE_CONFIG_ID.to_string(),
            org_id: non_empty(vars, "VW_ORG_ID")
                .map(|v| strip_org_prefix(&v))
                .unwrap_or_default(),
            vw_url: non_empty(vars, "VW_URL").unwrap_or_else(|| DEFAULT_VAULT_URL.to_string()),
            client_id: non_empty(vars, "VW_USER_CLIENT_ID").unwrap_or_default(),
            client_secret: non_empty(vars, "VW_USER_CLIENT_SECRET").unwrap_or_default(),
            group_filter: non_empty(vars, "LDAP_USER_GROUPS").unwrap_or_default(),
            tls_verify: !non_empty(vars, "IGNORE_VW_CERT")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            timeout_secs,
        }
    }

    fn apply(&mut self, family: Family, value: &str) {
        match family {
            Family::OrgId => self.org_id = strip_org_prefix(value),
            Family::ClientId => self.client_id = value.to_string(),
            Family::ClientSecret => self.client_secret = value.to_string(),
            Family::Url => self.vw_url = value.to_string(),
            Family::UserGroups => self.group_filter = value.to_string(),
            Family::IgnoreCert => self.tls_verify = !is_truthy(value),
        }
    }

    /// Equal to `other` in everything but the config id
    fn has_same_settings(&self, other: &Self) -> bool {
        let renamed = Self {
            config_id: other.config_id.clone(),
            ..self.clone()
        };
        renamed == *other
    }

    fn check(&self) -> Option<RejectReason> {
        if self.org_id.is_empty() || self.group_filter.is_empty() {
            Some(RejectReason::MissingRequiredFields)
        } else if self.client_id.is_empty() || self.client_secret.is_empty() {
            Some(RejectReason::MissingCredentials)
        } else {
            None
        }
    }
}

impl fmt::Debug for OrganizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizationConfig")
            .field("config_id", &self.config_id)
            .field("org_id", &self.org_id)
            .field("vw_url", &self.vw_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("group_filter", &self.group_filter)
            .field("tls_verify", &self.tls_verify)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Why a record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingRequiredFields,
    MissingCredentials,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingRequiredFields => f.write_str("missing required fields"),
            RejectReason::MissingCredentials => f.write_str("missing credentials"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedConfig {
    pub config_id: String,
    pub reason: RejectReason,
}

/// Valid organization configs keyed by config id, plus the ones dropped
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrgConfigSet {
    configs: BTreeMap<String, OrganizationConfig>,
    rejected: Vec<RejectedConfig>,
}

impl OrgConfigSet {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let timeout_secs = non_empty(&vars, "VW_TIMEOUT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_VAULT_TIMEOUT_SECS);
        Self::parse(&vars, timeout_secs)
    }

    pub(crate) fn parse(vars: &Vars, timeout_secs: u64) -> Self {
        let base = OrganizationConfig::base(vars, timeout_secs);

        // suffix -> overrides; BTreeMap keeps suffixes sorted
        let mut overrides: BTreeMap<String, Vec<(Family, String)>> = BTreeMap::new();
        for (key, value) in vars {
            for family in Family::ALL {
                let Some(suffix) = family.suffix_of(key) else {
                    continue;
                };
                if !SUFFIX_PATTERN.is_match(suffix) {
                    warn!(key = %key, "Ignoring organization key with malformed suffix");
                    continue;
                }
                if suffix.eq_ignore_ascii_case(BASE_CONFIG_ID) {
                    warn!(key = %key, "Ignoring organization key with reserved suffix");
                    continue;
                }
                let entry = overrides.entry(suffix.to_string()).or_default();
                let value = value.trim();
                if !value.is_empty() {
                    entry.push((family, value.to_string()));
                }
            }
        }

        let mut set = Self::default();
        set.admit(base.clone());
        for (suffix, fields) in overrides {
            let mut config = base.clone();
            config.config_id = suffix;
            for (family, value) in fields {
                config.apply(family, &value);
            }
            if config.has_same_settings(&base) {
                debug!(config_id = %config.config_id, "Ignoring organization config identical to the base");
                continue;
            }
            set.admit(config);
        }

        debug!(
            configs = set.configs.len(),
            rejected = set.rejected.len(),
            "Parsed organization configs"
        );
        set
    }

    fn admit(&mut self, config: OrganizationConfig) {
        match config.check() {
            None => {
                self.configs.insert(config.config_id.clone(), config);
            }
            Some(reason) => {
                warn!(config_id = %config.config_id, reason = %reason, "Dropping organization config");
                self.rejected.push(RejectedConfig {
                    config_id: config.config_id,
                    reason,
                });
            }
        }
    }

    pub fn configs(&self) -> &BTreeMap<String, OrganizationConfig> {
        &self.configs
    }

    pub fn rejected(&self) -> &[RejectedConfig] {
        &self.rejected
    }

    pub fn get(&self, config_id: &str) -> Option<&OrganizationConfig> {
        self.configs.get(config_id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> OrgConfigSet {
        OrgConfigSet::from_vars(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    const BASE: &[(&str, &str)] = &[
        ("VW_ORG_ID", "O"),
        ("LDAP_USER_GROUPS", "G"),
        ("VW_USER_CLIENT_ID", "user.base"),
        ("VW_USER_CLIENT_SECRET", "base-secret"),
        ("VW_URL", "https://vault.local"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        BASE.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_suffix_inherits_from_base() {
        let set = parse(&with(&[("LDAP_USER_GROUPS_2", "G2")]));

        let derived = set.get("2").unwrap();
        assert_eq!(derived.org_id, "O");
        assert_eq!(derived.group_filter, "G2");
        assert_eq!(derived.client_id, "user.base");
        assert_eq!(derived.client_secret, "base-secret");
        assert_eq!(derived.vw_url, "https://vault.local");

        let base = set.get(BASE_CONFIG_ID).unwrap();
        assert_eq!(base.group_filter, "G");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_override_wins_only_when_non_empty() {
        let set = parse(&with(&[
            ("VW_ORG_ID_TEAM", "organization.T"),
            ("VW_USER_CLIENT_ID_TEAM", "user.team"),
            ("VW_USER_CLIENT_SECRET_TEAM", "  "),
            ("IGNORE_VW_CERT_TEAM", "true"),
        ]));
        let team = set.get("TEAM").unwrap();
        assert_eq!(team.org_id, "T");
        assert_eq!(team.client_id, "user.team");
        assert_eq!(team.client_secret, "base-secret");
        assert!(!team.tls_verify);
        assert!(set.get(BASE_CONFIG_ID).unwrap().tls_verify);
    }

    #[test]
    fn test_suffix_without_effective_override_is_dropped() {
        let set = parse(&with(&[
            ("VW_URL_SCHEME", ""),
            ("VW_ORG_ID_COPY", "organization.O"),
            ("LDAP_USER_GROUPS_COPY", "G"),
        ]));
        assert_eq!(set.len(), 1);
        assert!(set.get("SCHEME").is_none());
        assert!(set.get("COPY").is_none());
        assert!(set.rejected().is_empty());
    }

    #[test]
    fn test_invalid_records_are_rejected_with_reason() {
        let set = parse(&[
            ("VW_ORG_ID", "O"),
            ("VW_USER_CLIENT_ID", "user.base"),
            ("VW_USER_CLIENT_SECRET", "s"),
            ("LDAP_USER_GROUPS_OPS", "cn=ops"),
            ("VW_ORG_ID_NOCREDS", "X"),
        ]);
        // Base has no group filter; OPS inherits O and gets one
        assert!(set.get(BASE_CONFIG_ID).is_none());
        assert!(set.get("OPS").is_some());
        assert!(set.rejected().contains(&RejectedConfig {
            config_id: BASE_CONFIG_ID.to_string(),
            reason: RejectReason::MissingRequiredFields,
        }));
        assert!(set.rejected().iter().any(|r| r.config_id == "NOCREDS"
            && r.reason == RejectReason::MissingRequiredFields));

        let set = parse(&[("VW_ORG_ID", "O"), ("LDAP_USER_GROUPS", "G")]);
        assert_eq!(set.rejected()[0].reason, RejectReason::MissingCredentials);
        assert_eq!(set.rejected()[0].reason.to_string(), "missing credentials");
    }

    #[test]
    fn test_malformed_and_reserved_suffixes_are_skipped() {
        let set = parse(&with(&[
            ("VW_ORG_ID_bad-suffix", "X"),
            ("VW_ORG_ID__LEADING", "X"),
            ("LDAP_USER_GROUPS_Default", "cn=other"),
            ("VW_ORG_ID_A_B", "AB"),
        ]));
        let ids: Vec<&str> = set.configs().keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["A_B", BASE_CONFIG_ID]);
        assert_eq!(set.get(BASE_CONFIG_ID).unwrap().group_filter, "G");
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let set = parse(&with(&[("VW_TIMEOUT", "5"), ("LDAP_USER_GROUPSX", "cn=x")]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(BASE_CONFIG_ID).unwrap().timeout_secs, 5);
    }

    #[test]
    fn test_debug_and_json_hide_secret() {
        let set = parse(BASE);
        let config = set.get(BASE_CONFIG_ID).unwrap();
        assert!(!format!("{:?}", config).contains("base-secret"));
        let json = serde_json::to_string(&set).unwrap();
        assert!(!json.contains("base-secret"));
        assert!(json.contains("user.base"));
    }
}
