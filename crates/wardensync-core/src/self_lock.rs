//! Self-lock guard
//!
//! Keeps the service account from revoking its own organization membership.

use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::provider::VaultProvider;

/// Prefix carried by personal API client ids
pub const CLIENT_ID_PREFIX: &str = "user.";

/// Account id embedded in a personal API client id
pub fn account_id_from_client_id(client_id: &str) -> Option<Uuid> {
    let raw = client_id.trim();
    let raw = raw.strip_prefix(CLIENT_ID_PREFIX).unwrap_or(raw);
    Uuid::parse_str(raw).ok()
}

/// Resolve the lower-cased email of the service account in `org_id`.
///
/// Never fails: provider errors are logged and yield `None`.
pub async fn find_own_email(
    client_id: &str,
    provider: &dyn VaultProvider,
    org_id: &str,
) -> Option<String> {
    let Some(account_id) = account_id_from_client_id(client_id) else {
        debug!("Client id is not a personal API key, skipping self-lock lookup");
        return None;
    };

    match provider.resolve_own_email(org_id, account_id).await {
        Ok(Some(email)) => {
            let email = email.trim().to_lowercase();
            debug!(org_id = %org_id, email = %email, "Resolved service account email");
            Some(email)
        }
        Ok(None) => {
            debug!(org_id = %org_id, "Service account is not a member of the organization");
            None
        }
        Err(e) => {
            warn!(org_id = %org_id, error = %e, "Failed to resolve service account email");
            None
        }
    }
}

/// Whitelist for one reconciliation pass
pub async fn build_whitelist(
    enabled: bool,
    client_id: &str,
    provider: &dyn VaultProvider,
    org_id: &str,
) -> BTreeSet<String> {
    let mut whitelist = BTreeSet::new();
    if enabled {
        if let Some(email) = find_own_email(client_id, provider, org_id).await {
            whitelist.insert(email);
        }
    }
    whitelist
}
