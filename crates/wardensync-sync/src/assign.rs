//! Multi-organization user assignment

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error};
use wardensync_core::{DirectoryProvider, DirectoryQuery, DirectoryUser, OrgConfigSet};

/// Target membership per config id, plus the configs whose lookup failed
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub targets: BTreeMap<String, BTreeSet<String>>,
    pub failed: BTreeMap<String, String>,
}

/// Enabled emails in each config's group scope.
///
/// A failed lookup is logged and recorded as an empty set; the remaining
/// configs are still resolved.
pub async fn assign_users_to_organizations(
    configs: &OrgConfigSet,
    directory: &dyn DirectoryProvider,
    base_query: &DirectoryQuery,
) -> BTreeMap<String, BTreeSet<String>> {
    resolve_assignment(configs, directory, base_query).await.targets
}

/// Same as [`assign_users_to_organizations`], keeping the lookup failures
pub async fn resolve_assignment(
    configs: &OrgConfigSet,
    directory: &dyn DirectoryProvider,
    base_query: &DirectoryQuery,
) -> Assignment {
    let mut assignment = Assignment::default();

    for (config_id, config) in configs.configs() {
        let query = base_query.with_groups(Some(config.group_filter.as_str()));
        let emails = match directory.fetch_users(&query).await {
            Ok(users) => users
                .iter()
                .filter(|u| !u.disabled)
                .filter_map(DirectoryUser::normalized_email)
                .collect(),
            Err(e) => {
                error!(config_id = %config_id, error = %e, "Failed to resolve organization members");
                assignment.failed.insert(config_id.clone(), e.to_string());
                BTreeSet::new()
            }
        };
        debug!(config_id = %config_id, users = emails.len(), "Resolved organization target set");
        assignment.targets.insert(config_id.clone(), emails);
    }

    assignment
}

/// The part of a shared snapshot one organization reconciles against:
/// every disabled user, plus enabled users in its target set
pub fn scoped_view(users: &[DirectoryUser], targets: &BTreeSet<String>) -> Vec<DirectoryUser> {
    users
        .iter()
        .filter(|u| {
            u.disabled
                || u
                    .normalized_email()
                    .map(|e| targets.contains(&e))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}
