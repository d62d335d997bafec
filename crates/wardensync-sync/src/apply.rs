//! Action application

use std::fmt;
use tracing::{error, info};
use wardensync_core::{MemberMap, SyncActions, VaultProvider};

use crate::metrics::record_action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Invite,
    Revoke,
    Restore,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Invite => "invite",
            ActionKind::Revoke => "revoke",
            ActionKind::Restore => "restore",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply `actions` to `org_id`: invites, then revokes, then restores.
///
/// Revoke and restore address members by the id found in `members`, the
/// snapshot the actions were computed from. A failed action does not stop
/// the others; each failure is returned as `"<action> <email>: <error>"`.
pub async fn apply_actions(
    provider: &dyn VaultProvider,
    org_id: &str,
    actions: &SyncActions,
    members: &MemberMap,
) -> Vec<String> {
    let mut errors = Vec::new();

    for email in &actions.invite {
        info!(org_id = %org_id, email = %email, "Inviting user");
        let result = provider.invite(org_id, email).await;
        settle(ActionKind::Invite, email, result, &mut errors);
    }

    for (kind, emails) in [
        (ActionKind::Revoke, &actions.revoke),
        (ActionKind::Restore, &actions.restore),
    ] {
        for email in emails {
            let Some(member) = members.get(email) else {
                settle(
                    kind,
                    email,
                    Err(wardensync_core::Error::InvalidArgument(
                        "no member with this email in the organization snapshot".to_string(),
                    )),
                    &mut errors,
                );
                continue;
            };
            let result = match kind {
                ActionKind::Revoke => {
                    info!(org_id = %org_id, email = %email, "Revoking user");
                    provider.revoke(org_id, &member.id).await
                }
                _ => {
                    info!(org_id = %org_id, email = %email, "Restoring user");
                    provider.restore(org_id, &member.id).await
                }
            };
            settle(kind, email, result, &mut errors);
        }
    }

    errors
}

fn settle(
    kind: ActionKind,
    email: &str,
    result: wardensync_core::Result<()>,
    errors: &mut Vec<String>,
) {
    record_action(kind, result.is_ok());
    if let Err(e) = result {
        error!(action = %kind, email = %email, error = %e, "Action failed");
        errors.push(format!("{} {}: {}", kind, email, e));
    }
}
