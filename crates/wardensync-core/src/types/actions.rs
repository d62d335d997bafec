//! Reconciliation result

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Emails that need to be invited, revoked or restored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncActions {
    pub invite: BTreeSet<String>,
    pub revoke: BTreeSet<String>,
    pub restore: BTreeSet<String>,
}

impl SyncActions {
    pub fn is_empty(&self) -> bool {
        self.invite.is_empty() && self.revoke.is_empty() && self.restore.is_empty()
    }

    pub fn total(&self) -> usize {
        self.invite.len() + self.revoke.len() + self.restore.len()
    }

    /// Union another action set into this one
    pub fn merge(&mut self, other: &SyncActions) {
        self.invite.extend(other.invite.iter().cloned());
        self.revoke.extend(other.revoke.iter().cloned());
        self.restore.extend(other.restore.iter().cloned());
    }

    /// True when no email appears in more than one category
    pub fn is_disjoint(&self) -> bool {
        self.invite.is_disjoint(&self.revoke)
            && self.invite.is_disjoint(&self.restore)
            && self.revoke.is_disjoint(&self.restore)
    }
}
