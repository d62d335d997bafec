//! Collaborator interfaces
//!
//! The orchestrator only talks to the directory and to the vault through
//! these traits. Implementations live in `wardensync-ldap` and
//! `wardensync-vault`.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{
    DirectoryQuery, DirectoryUser, ManagedOrganization, MemberId, OrgMember, VaultCredentials,
};
use crate::Result;

/// Source of directory snapshots
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Fetch every user matching `query`, with the lock flag classified
    async fn fetch_users(&self, query: &DirectoryQuery) -> Result<Vec<DirectoryUser>>;
}

/// Vault session bound to one set of credentials
#[async_trait]
pub trait VaultProvider: Send + Sync {
    async fn list_members(&self, org_id: &str) -> Result<Vec<OrgMember>>;

    async fn invite(&self, org_id: &str, email: &str) -> Result<()>;

    async fn revoke(&self, org_id: &str, member_id: &MemberId) -> Result<()>;

    async fn restore(&self, org_id: &str, member_id: &MemberId) -> Result<()>;

    /// Organizations the session's account belongs to, manageable or not
    async fn list_organizations(&self) -> Result<Vec<ManagedOrganization>>;

    /// Organizations the session's account can administer
    async fn list_manageable_organizations(&self) -> Result<Vec<ManagedOrganization>> {
        Ok(self
            .list_organizations()
            .await?
            .into_iter()
            .filter(ManagedOrganization::is_manageable)
            .collect())
    }

    /// Email of the member whose underlying account is `account_id`
    async fn resolve_own_email(&self, org_id: &str, account_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .list_members(org_id)
            .await?
            .into_iter()
            .find(|m| m.account_id == Some(account_id))
            .map(|m| m.email))
    }
}

/// Factory for vault sessions
#[async_trait]
pub trait VaultConnector: Send + Sync {
    async fn connect(&self, credentials: &VaultCredentials) -> Result<Arc<dyn VaultProvider>>;
}
