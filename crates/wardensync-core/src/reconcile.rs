//! Reconciliation engine
//!
//! Pure set algebra over one directory snapshot and one vault snapshot:
//!
//! - invite:  enabled in the directory, unknown to the vault
//! - revoke:  disabled in the directory, active in the vault
//! - restore: enabled in the directory, revoked in the vault
//!
//! In strict mode every active member that is not an enabled directory user
//! is revoked as well. The whitelist shields emails from revocation only.
//!
//! When one address belongs to both an enabled and a disabled directory
//! entry it is treated as enabled: it is never revoked, and it is invited or
//! restored like any other enabled user. This keeps the three action sets
//! disjoint.

use std::collections::BTreeSet;

use crate::types::{DirectoryUser, MemberMap, SyncActions};

/// Compute the actions needed to converge `members` onto `users`
pub fn reconcile(
    users: &[DirectoryUser],
    members: &MemberMap,
    whitelist: &BTreeSet<String>,
    strict: bool,
) -> SyncActions {
    let mut enabled_dir = BTreeSet::new();
    let mut disabled_dir = BTreeSet::new();
    for user in users {
        let Some(email) = user.normalized_email() else {
            continue;
        };
        if user.disabled {
            disabled_dir.insert(email);
        } else {
            enabled_dir.insert(email);
        }
    }
    // An address shared by an enabled and a disabled entry counts as enabled
    disabled_dir.retain(|e| !enabled_dir.contains(e));

    let whitelist: BTreeSet<String> = whitelist.iter().map(|e| e.trim().to_lowercase()).collect();

    let active_vw: BTreeSet<String> = members
        .iter()
        .filter(|(_, m)| m.is_active())
        .map(|(email, _)| email.to_lowercase())
        .collect();
    let revoked_vw: BTreeSet<String> = members
        .iter()
        .filter(|(_, m)| m.is_revoked())
        .map(|(email, _)| email.to_lowercase())
        .collect();

    let invite = enabled_dir
        .iter()
        .filter(|e| !active_vw.contains(*e) && !revoked_vw.contains(*e) && !whitelist.contains(*e))
        .cloned()
        .collect();

    let mut revoke: BTreeSet<String> = disabled_dir
        .intersection(&active_vw)
        .filter(|e| !whitelist.contains(*e))
        .cloned()
        .collect();

    let restore = enabled_dir.intersection(&revoked_vw).cloned().collect();

    if strict {
        revoke.extend(
            active_vw
                .iter()
                .filter(|e| !enabled_dir.contains(*e) && !whitelist.contains(*e))
                .cloned(),
        );
    }

    SyncActions {
        invite,
        revoke,
        restore,
    }
}
