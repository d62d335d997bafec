//! Vault-side types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Membership status at or above which an organization can be managed
pub const MANAGEABLE_STATUS_THRESHOLD: i32 = 2;

/// Organization membership id (not the account id)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Membership status as reported by the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MemberStatus {
    Revoked,
    Invited,
    Accepted,
    Confirmed,
    Unknown(i32),
}

impl From<i32> for MemberStatus {
    fn from(code: i32) -> Self {
        match code {
            -1 => MemberStatus::Revoked,
            0 => MemberStatus::Invited,
            1 => MemberStatus::Accepted,
            2 => MemberStatus::Confirmed,
            other => MemberStatus::Unknown(other),
        }
    }
}

impl From<MemberStatus> for i32 {
    fn from(status: MemberStatus) -> Self {
        match status {
            MemberStatus::Revoked => -1,
            MemberStatus::Invited => 0,
            MemberStatus::Accepted => 1,
            MemberStatus::Confirmed => 2,
            MemberStatus::Unknown(code) => code,
        }
    }
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Revoked => "revoked",
            MemberStatus::Invited => "invited",
            MemberStatus::Accepted => "accepted",
            MemberStatus::Confirmed => "confirmed",
            MemberStatus::Unknown(_) => "unknown",
        }
    }
}

/// A member of a vault organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMember {
    /// Organization membership id, used for revoke/restore
    pub id: MemberId,

    /// Underlying account id; absent for invitations not yet accepted
    pub account_id: Option<Uuid>,

    pub email: String,

    pub status: MemberStatus,
}

impl OrgMember {
    pub fn new(id: impl Into<String>, email: impl Into<String>, status: MemberStatus) -> Self {
        Self {
            id: MemberId::new(id),
            account_id: None,
            email: email.into(),
            status,
        }
    }

    pub fn with_account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Member can use the vault (owners are confirmed members)
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            MemberStatus::Invited | MemberStatus::Accepted | MemberStatus::Confirmed
        )
    }

    pub fn is_revoked(&self) -> bool {
        self.status == MemberStatus::Revoked
    }
}

/// Members keyed by lower-cased email
pub type MemberMap = BTreeMap<String, OrgMember>;

/// Index members by lower-cased email. Later duplicates replace earlier ones.
pub fn member_map(members: impl IntoIterator<Item = OrgMember>) -> MemberMap {
    members
        .into_iter()
        .map(|m| (m.email.trim().to_lowercase(), m))
        .collect()
}

/// An organization visible to the service account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedOrganization {
    pub id: String,
    pub name: String,

    /// Membership status of the service account in this organization
    pub status: i32,

    /// Role of the service account (0 owner, 1 admin, 2 user, 3 manager, 4 custom)
    pub role: i32,

    pub enabled: bool,
}

impl ManagedOrganization {
    pub fn is_manageable(&self) -> bool {
        self.enabled && self.status >= MANAGEABLE_STATUS_THRESHOLD
    }
}

/// Everything needed to open a session against the vault
#[derive(Clone, PartialEq, Eq)]
pub struct VaultCredentials {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
    pub tls_verify: bool,
    pub timeout: Duration,
}

impl fmt::Debug for VaultCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultCredentials")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("tls_verify", &self.tls_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MemberStatus::from(-1), MemberStatus::Revoked);
        assert_eq!(MemberStatus::from(2), MemberStatus::Confirmed);
        assert_eq!(MemberStatus::from(7), MemberStatus::Unknown(7));
        assert_eq!(i32::from(MemberStatus::Accepted), 1);
    }

    #[test]
    fn test_active_and_revoked_are_exclusive() {
        for code in -2..5 {
            let member = OrgMember::new("m", "a@example.com", MemberStatus::from(code));
            assert!(!(member.is_active() && member.is_revoked()), "status {}", code);
        }
        assert!(OrgMember::new("m", "a@example.com", MemberStatus::Confirmed).is_active());
        assert!(OrgMember::new("m", "a@example.com", MemberStatus::Revoked).is_revoked());
        assert!(!OrgMember::new("m", "a@example.com", MemberStatus::Unknown(9)).is_active());
    }

    #[test]
    fn test_member_map_lowercases_keys() {
        let map = member_map(vec![OrgMember::new(
            "1",
            "Bob@Example.com",
            MemberStatus::Confirmed,
        )]);
        assert!(map.contains_key("bob@example.com"));
        assert_eq!(map["bob@example.com"].email, "Bob@Example.com");
    }

    #[test]
    fn test_manageable_threshold() {
        let mut org = ManagedOrganization {
            id: "o".to_string(),
            name: "Org".to_string(),
            status: 2,
            role: 1,
            enabled: true,
        };
        assert!(org.is_manageable());

        org.status = 1;
        assert!(!org.is_manageable());

        org.status = 2;
        org.enabled = false;
        assert!(!org.is_manageable());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = VaultCredentials {
            url: "http://localhost:8080".to_string(),
            client_id: "user.abc".to_string(),
            client_secret: "s3cr3t".to_string(),
            tls_verify: true,
            timeout: Duration::from_secs(30),
        };
        let out = format!("{:?}", creds);
        assert!(!out.contains("s3cr3t"));
        assert!(out.contains("***"));
    }
}
