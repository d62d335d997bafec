//! Wire types for the Bitwarden-compatible REST API
//!
//! Vaultwarden answers in camelCase, older servers in PascalCase; both are
//! accepted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wardensync_core::{ManagedOrganization, MemberStatus, OrgMember};

/// Role code sent with invitations (plain user)
pub const INVITE_ROLE_USER: i32 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// `{ "data": [...] }` envelope used by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(alias = "Data", default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    #[serde(alias = "Id")]
    pub id: String,

    #[serde(alias = "UserId", default)]
    pub user_id: Option<Uuid>,

    #[serde(alias = "Email", default)]
    pub email: Option<String>,

    #[serde(alias = "Status")]
    pub status: i32,
}

impl MemberDto {
    /// Domain member, `None` when the record carries no email
    pub fn into_member(self) -> Option<OrgMember> {
        let email = self.email.filter(|e| !e.trim().is_empty())?;
        let member = OrgMember::new(self.id, email, MemberStatus::from(self.status));
        Some(match self.user_id {
            Some(account_id) => member.with_account_id(account_id),
            None => member,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    #[serde(alias = "Organizations", default)]
    pub organizations: Vec<OrganizationDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDto {
    #[serde(alias = "Id")]
    pub id: String,

    #[serde(alias = "Name", default)]
    pub name: String,

    #[serde(alias = "Status", default)]
    pub status: i32,

    #[serde(rename = "type", alias = "Type", default)]
    pub role: i32,

    #[serde(alias = "Enabled", default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl From<OrganizationDto> for ManagedOrganization {
    fn from(dto: OrganizationDto) -> Self {
        ManagedOrganization {
            id: dto.id,
            name: dto.name,
            status: dto.status,
            role: dto.role,
            enabled: dto.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub emails: Vec<String>,

    #[serde(rename = "type")]
    pub role: i32,

    pub access_all: bool,
    pub collections: Vec<serde_json::Value>,
    pub groups: Vec<String>,
    pub permissions: serde_json::Map<String, serde_json::Value>,
}

impl InviteRequest {
    pub fn user(email: &str) -> Self {
        Self {
            emails: vec![email.to_string()],
            role: INVITE_ROLE_USER,
            access_all: false,
            collections: Vec::new(),
            groups: Vec::new(),
            permissions: serde_json::Map::new(),
        }
    }
}
