//! Sync orchestration
//!
//! Drives one reconciliation cycle in single, auto-discovery or
//! multi-organization mode and applies the resulting actions.

pub mod apply;
pub mod assign;
pub mod metrics;
pub mod report;
pub mod synchronizer;

#[cfg(test)]
mod testing;

pub use apply::{apply_actions, ActionKind};
pub use assign::{assign_users_to_organizations, scoped_view};
pub use report::{CyclePhase, CycleReport, OrgSyncReport, SyncMode};
pub use synchronizer::Synchronizer;
