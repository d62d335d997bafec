//! Sync orchestrator
//!
//! One call drives one cycle: pick the mode from the configuration, take
//! the directory snapshot, then run a fetch-reconcile-apply pass per
//! organization. Organizations are processed one after another and a failed
//! pass never aborts its siblings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wardensync_core::config::{OrganizationConfig, SyncConfig};
use wardensync_core::self_lock::build_whitelist;
use wardensync_core::{
    member_map, reconcile, DirectoryProvider, DirectoryUser, Error, Result, VaultConnector,
    VaultProvider,
};

use crate::apply::apply_actions;
use crate::assign::{resolve_assignment, scoped_view};
use crate::report::{CyclePhase, CycleReport, OrgSyncReport, SyncMode};

/// Label of the organization pass in single-organization mode
pub const SINGLE_ORG_LABEL: &str = "default";

/// Per-organization settings of one pass
struct Pass<'a> {
    org_id: &'a str,
    client_id: &'a str,
    prevent_self_lock: bool,
    strict: bool,
    apply: bool,
}

pub struct Synchronizer {
    directory: Arc<dyn DirectoryProvider>,
    connector: Arc<dyn VaultConnector>,
}

impl Synchronizer {
    pub fn new(directory: Arc<dyn DirectoryProvider>, connector: Arc<dyn VaultConnector>) -> Self {
        Self {
            directory,
            connector,
        }
    }

    /// Mode for a cycle under `config`
    pub fn select_mode(config: &SyncConfig) -> Result<SyncMode> {
        if config.multi_org_mode {
            Ok(SyncMode::MultiOrg)
        } else if !config.vault.org_id.is_empty() {
            Ok(SyncMode::Single)
        } else if config.directory.has_scope() {
            Ok(SyncMode::AutoDiscovery)
        } else {
            Err(Error::Configuration(
                "VW_ORG_ID is required unless LDAP_USER_GROUPS or LDAP_FILTER enables auto-discovery"
                    .to_string(),
            ))
        }
    }

    /// Run one cycle and apply the computed actions
    pub async fn run_cycle(&self, config: &SyncConfig) -> Result<CycleReport> {
        self.execute(config, true).await
    }

    /// Fetch and reconcile without applying anything
    pub async fn plan(&self, config: &SyncConfig) -> Result<CycleReport> {
        self.execute(config, false).await
    }

    async fn execute(&self, config: &SyncConfig, apply: bool) -> Result<CycleReport> {
        let mode = Self::select_mode(config)?;
        info!(mode = mode.as_str(), dry_run = !apply, "Starting sync cycle");

        let mut report = CycleReport::new(mode, !apply);
        match mode {
            SyncMode::Single => self.run_single(config, apply, &mut report).await,
            SyncMode::AutoDiscovery => self.run_auto_discovery(config, apply, &mut report).await?,
            SyncMode::MultiOrg => self.run_multi_org(config, apply, &mut report).await?,
        }

        let total = report.total_actions();
        info!(
            mode = mode.as_str(),
            organizations = report.organizations.len(),
            succeeded = report.succeeded_count(),
            invite = total.invite.len(),
            revoke = total.revoke.len(),
            restore = total.restore.len(),
            "Sync cycle finished"
        );
        for failed in report.failed() {
            error!(
                organization = %failed.label,
                org_id = %failed.org_id,
                phase = failed.failed_in.map(|p| p.as_str()).unwrap_or("unknown"),
                errors = %failed.error_text(),
                "Organization sync failed"
            );
        }

        Ok(report)
    }

    async fn run_single(&self, config: &SyncConfig, apply: bool, report: &mut CycleReport) {
        let vault = &config.vault;
        let mut org = OrgSyncReport::new(SINGLE_ORG_LABEL, vault.org_id.as_str());

        org.enter(CyclePhase::FetchingDirectory);
        let users = match self.directory.fetch_users(&config.directory.query()).await {
            Ok(users) => users,
            Err(e) => {
                org.fail(e.to_string());
                report.organizations.push(org);
                return;
            }
        };

        org.enter(CyclePhase::FetchingVault);
        match self.connector.connect(&vault.credentials()).await {
            Ok(provider) => {
                let pass = Pass {
                    org_id: &vault.org_id,
                    client_id: &vault.client_id,
                    prevent_self_lock: config.prevent_self_lock,
                    strict: config.users_only,
                    apply,
                };
                sync_organization(&mut org, provider.as_ref(), &users, &pass).await;
            }
            Err(e) => org.fail(e.to_string()),
        }
        report.organizations.push(org);
    }

    async fn run_auto_discovery(
        &self,
        config: &SyncConfig,
        apply: bool,
        report: &mut CycleReport,
    ) -> Result<()> {
        let provider = self.connector.connect(&config.vault.credentials()).await?;
        let organizations = provider.list_manageable_organizations().await?;
        if organizations.is_empty() {
            return Err(Error::Configuration(
                "Auto-discovery found no manageable organizations for the configured credentials"
                    .to_string(),
            ));
        }
        info!(
            organizations = organizations.len(),
            "Auto-discovery found manageable organizations"
        );

        let users = self.directory.fetch_users(&config.directory.query()).await?;

        for organization in &organizations {
            let mut org = OrgSyncReport::new(organization.name.as_str(), organization.id.as_str());
            org.enter(CyclePhase::FetchingVault);
            let pass = Pass {
                org_id: &organization.id,
                client_id: &config.vault.client_id,
                prevent_self_lock: config.prevent_self_lock,
                strict: config.users_only,
                apply,
            };
            sync_organization(&mut org, provider.as_ref(), &users, &pass).await;
            report.organizations.push(org);
        }
        Ok(())
    }

    async fn run_multi_org(
        &self,
        config: &SyncConfig,
        apply: bool,
        report: &mut CycleReport,
    ) -> Result<()> {
        let configs = &config.organizations;
        if configs.is_empty() {
            return Err(Error::Configuration(
                "Multi-organization mode is enabled but no valid organization config was found"
                    .to_string(),
            ));
        }

        let base_query = config.directory.query();
        let assignment = resolve_assignment(configs, self.directory.as_ref(), &base_query).await;
        let shared = self
            .directory
            .fetch_users(&base_query.with_groups(None))
            .await?;

        // Configs targeting the same organization share one pass over the
        // union of their target sets
        let mut groups: BTreeMap<(&str, &str), Vec<(&String, &OrganizationConfig)>> =
            BTreeMap::new();
        for (config_id, org_config) in configs.configs() {
            groups
                .entry((org_config.vw_url.as_str(), org_config.org_id.as_str()))
                .or_default()
                .push((config_id, org_config));
        }

        for ((_, org_id), members) in groups {
            let config_ids: Vec<&str> = members.iter().map(|(id, _)| id.as_str()).collect();
            let mut org = OrgSyncReport::new(config_ids.join(","), org_id);
            org.enter(CyclePhase::FetchingDirectory);

            let failures: Vec<String> = members
                .iter()
                .filter_map(|(id, _)| assignment.failed.get(*id))
                .cloned()
                .collect();
            if !failures.is_empty() {
                org.fail_all(failures);
                report.organizations.push(org);
                continue;
            }

            let targets: BTreeSet<String> = members
                .iter()
                .filter_map(|(id, _)| assignment.targets.get(*id))
                .flatten()
                .cloned()
                .collect();
            let users = scoped_view(&shared, &targets);
            info!(
                configs = %config_ids.join(","),
                org_id = %org_id,
                users = targets.len(),
                "Syncing organization"
            );

            // The first config id in sorted order supplies the credentials
            let (_, org_config) = members[0];
            org.enter(CyclePhase::FetchingVault);
            match self.connector.connect(&org_config.credentials()).await {
                Ok(provider) => {
                    let pass = Pass {
                        org_id,
                        client_id: &org_config.client_id,
                        prevent_self_lock: config.prevent_self_lock,
                        strict: config.users_only,
                        apply,
                    };
                    sync_organization(&mut org, provider.as_ref(), &users, &pass).await;
                }
                Err(e) => org.fail(e.to_string()),
            }
            report.organizations.push(org);
        }
        Ok(())
    }
}

/// Fetch members, reconcile and (unless planning) apply for one organization
async fn sync_organization(
    org: &mut OrgSyncReport,
    provider: &dyn VaultProvider,
    users: &[DirectoryUser],
    pass: &Pass<'_>,
) {
    org.enter(CyclePhase::FetchingVault);
    let members = match provider.list_members(pass.org_id).await {
        Ok(members) => member_map(members),
        Err(e) => {
            org.fail(e.to_string());
            return;
        }
    };
    debug!(
        org_id = %pass.org_id,
        directory_users = users.len(),
        members = members.len(),
        "Snapshots ready"
    );

    org.enter(CyclePhase::Reconciling);
    let whitelist =
        build_whitelist(pass.prevent_self_lock, pass.client_id, provider, pass.org_id).await;
    org.actions = reconcile(users, &members, &whitelist, pass.strict);
    debug!(
        org_id = %pass.org_id,
        invite = ?org.actions.invite,
        revoke = ?org.actions.revoke,
        restore = ?org.actions.restore,
        "Action plan"
    );

    if !pass.apply || org.actions.is_empty() {
        org.succeed();
        return;
    }

    org.enter(CyclePhase::Applying);
    let errors = apply_actions(provider, pass.org_id, &org.actions, &members).await;
    if errors.is_empty() {
        org.succeed();
    } else {
        warn!(
            org_id = %pass.org_id,
            failed = errors.len(),
            "Errors encountered during sync"
        );
        org.fail_all(errors);
    }
}
