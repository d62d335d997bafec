//! In-memory directory and vault used by the orchestration tests

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use wardensync_core::filter::split_groups;
use wardensync_core::{
    DirectoryProvider, DirectoryQuery, DirectoryUser, Error, ManagedOrganization, MemberId,
    OrgMember, Result, VaultConnector, VaultCredentials, VaultProvider,
};

/// Account id of the service account used across tests
pub const ACCOUNT: &str = "0b6f2c1e-5a5e-4c43-9c1f-2f6a1d9e7b10";

pub const SERVICE_CLIENT_ID: &str = "user.0b6f2c1e-5a5e-4c43-9c1f-2f6a1d9e7b10";

#[derive(Default)]
pub struct FakeDirectory {
    users: Vec<DirectoryUser>,
    failing_groups: BTreeSet<String>,
    fail_all: bool,
}

impl FakeDirectory {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    /// User `name` with email `name@example.com`
    pub fn user(name: &str, groups: &[&str], disabled: bool) -> DirectoryUser {
        let email = format!("{}@example.com", name);
        let mut user = DirectoryUser::new(format!("uid={},dc=local", name), Some(&email), disabled);
        user.groups = groups.iter().map(|g| g.to_string()).collect();
        user
    }

    /// Fail every query scoped to `group`
    pub fn failing_for(mut self, group: &str) -> Self {
        self.failing_groups.insert(group.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }
}

#[async_trait]
impl DirectoryProvider for FakeDirectory {
    async fn fetch_users(&self, query: &DirectoryQuery) -> Result<Vec<DirectoryUser>> {
        if self.fail_all {
            return Err(Error::Connectivity("directory unreachable".to_string()));
        }
        let Some(raw) = query.groups.as_deref() else {
            return Ok(self.users.clone());
        };
        let groups = split_groups(raw);
        if groups.iter().any(|g| self.failing_groups.contains(*g)) {
            return Err(Error::Connectivity(format!("search failed for {}", raw)));
        }
        Ok(self
            .users
            .iter()
            .filter(|u| u.groups.iter().any(|g| groups.contains(&g.as_str())))
            .cloned()
            .collect())
    }
}

/// Vault session recording every successful mutation as `"<verb> <org> <target>"`
#[derive(Default)]
pub struct FakeVault {
    members: BTreeMap<String, Vec<OrgMember>>,
    organizations: Vec<ManagedOrganization>,
    failing_emails: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(mut self, org_id: &str, members: Vec<OrgMember>) -> Self {
        self.members.insert(org_id.to_string(), members);
        self
    }

    pub fn with_organizations(mut self, organizations: Vec<ManagedOrganization>) -> Self {
        self.organizations = organizations;
        self
    }

    /// Reject every mutation that targets `email`
    pub fn failing_on(mut self, email: &str) -> Self {
        self.failing_emails.insert(email.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn email_of(&self, org_id: &str, member_id: &MemberId) -> Option<&str> {
        self.members
            .get(org_id)?
            .iter()
            .find(|m| &m.id == member_id)
            .map(|m| m.email.as_str())
    }

    fn record(&self, verb: &str, org_id: &str, target: &str, email: Option<&str>) -> Result<()> {
        if email.is_some_and(|e| self.failing_emails.contains(e)) {
            return Err(Error::api(Some(500), "Internal Server Error"));
        }
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {} {}", verb, org_id, target));
        Ok(())
    }
}

#[async_trait]
impl VaultProvider for FakeVault {
    async fn list_members(&self, org_id: &str) -> Result<Vec<OrgMember>> {
        Ok(self.members.get(org_id).cloned().unwrap_or_default())
    }

    async fn invite(&self, org_id: &str, email: &str) -> Result<()> {
        self.record("invite", org_id, email, Some(email))
    }

    async fn revoke(&self, org_id: &str, member_id: &MemberId) -> Result<()> {
        let email = self.email_of(org_id, member_id);
        self.record("revoke", org_id, member_id.as_str(), email)
    }

    async fn restore(&self, org_id: &str, member_id: &MemberId) -> Result<()> {
        let email = self.email_of(org_id, member_id);
        self.record("restore", org_id, member_id.as_str(), email)
    }

    async fn list_organizations(&self) -> Result<Vec<ManagedOrganization>> {
        Ok(self.organizations.clone())
    }
}

/// Hands out the registered vault for a client id; unknown ids are rejected
#[derive(Default)]
pub struct FakeConnector {
    vaults: BTreeMap<String, Arc<FakeVault>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vault(mut self, client_id: &str, vault: Arc<FakeVault>) -> Self {
        self.vaults.insert(client_id.to_string(), vault);
        self
    }
}

#[async_trait]
impl VaultConnector for FakeConnector {
    async fn connect(&self, credentials: &VaultCredentials) -> Result<Arc<dyn VaultProvider>> {
        match self.vaults.get(&credentials.client_id) {
            Some(vault) => {
                let provider: Arc<dyn VaultProvider> = vault.clone();
                Ok(provider)
            }
            None => Err(Error::api(Some(400), "invalid_client")),
        }
    }
}
