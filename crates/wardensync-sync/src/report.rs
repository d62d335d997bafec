//! Cycle reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use wardensync_core::SyncActions;

/// Where an organization pass currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    FetchingDirectory,
    FetchingVault,
    Reconciling,
    Applying,
    Succeeded,
    Failed,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Idle => "idle",
            CyclePhase::FetchingDirectory => "fetching_directory",
            CyclePhase::FetchingVault => "fetching_vault",
            CyclePhase::Reconciling => "reconciling",
            CyclePhase::Applying => "applying",
            CyclePhase::Succeeded => "succeeded",
            CyclePhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CyclePhase::Succeeded | CyclePhase::Failed)
    }
}

/// How the organizations of a cycle were selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Single,
    AutoDiscovery,
    MultiOrg,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Single => "single",
            SyncMode::AutoDiscovery => "auto_discovery",
            SyncMode::MultiOrg => "multi_org",
        }
    }
}

/// Outcome of one organization pass
#[derive(Debug, Clone, Serialize)]
pub struct OrgSyncReport {
    /// Config id in multi-organization mode, organization name otherwise
    pub label: String,
    pub org_id: String,
    pub phase: CyclePhase,

    /// Phase in which the pass failed
    pub failed_in: Option<CyclePhase>,

    /// Computed actions; kept even when applying some of them failed
    pub actions: SyncActions,

    pub errors: Vec<String>,
}

impl OrgSyncReport {
    pub fn new(label: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            org_id: org_id.into(),
            phase: CyclePhase::Idle,
            failed_in: None,
            actions: SyncActions::default(),
            errors: Vec::new(),
        }
    }

    pub fn enter(&mut self, phase: CyclePhase) {
        debug_assert!(!self.phase.is_terminal(), "pass already finished");
        self.phase = phase;
    }

    /// Mark the pass failed in its current phase
    pub fn fail(&mut self, error: impl Into<String>) {
        self.fail_all(vec![error.into()]);
    }

    pub fn fail_all(&mut self, errors: Vec<String>) {
        self.failed_in = Some(self.phase);
        self.phase = CyclePhase::Failed;
        self.errors.extend(errors);
    }

    pub fn succeed(&mut self) {
        self.phase = CyclePhase::Succeeded;
    }

    pub fn is_success(&self) -> bool {
        self.phase == CyclePhase::Succeeded
    }

    /// Joined error text, empty on success
    pub fn error_text(&self) -> String {
        self.errors.join("; ")
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub mode: SyncMode,
    pub started_at: DateTime<Utc>,

    /// Set for dry runs; no action was applied
    pub dry_run: bool,

    pub organizations: Vec<OrgSyncReport>,
}

impl CycleReport {
    pub fn new(mode: SyncMode, dry_run: bool) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            dry_run,
            organizations: Vec::new(),
        }
    }

    /// True when every organization pass succeeded
    pub fn is_success(&self) -> bool {
        self.organizations.iter().all(OrgSyncReport::is_success)
    }

    /// Union of the actions of every organization
    pub fn total_actions(&self) -> SyncActions {
        let mut total = SyncActions::default();
        for org in &self.organizations {
            total.merge(&org.actions);
        }
        total
    }

    pub fn failed(&self) -> impl Iterator<Item = &OrgSyncReport> {
        self.organizations.iter().filter(|o| !o.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.organizations.iter().filter(|o| o.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_records_phase() {
        let mut report = OrgSyncReport::new("default", "org-1");
        report.enter(CyclePhase::FetchingDirectory);
        report.enter(CyclePhase::FetchingVault);
        report.fail("connection refused");

        assert_eq!(report.phase, CyclePhase::Failed);
        assert_eq!(report.failed_in, Some(CyclePhase::FetchingVault));
        assert!(!report.is_success());
        assert_eq!(report.error_text(), "connection refused");
    }

    #[test]
    fn test_cycle_success_requires_every_org() {
        let mut cycle = CycleReport::new(SyncMode::AutoDiscovery, false);

        let mut ok = OrgSyncReport::new("Ops", "o1");
        ok.actions.invite.insert("a@example.com".to_string());
        ok.succeed();
        cycle.organizations.push(ok);
        assert!(cycle.is_success());

        let mut bad = OrgSyncReport::new("Dev", "o2");
        bad.actions.invite.insert("b@example.com".to_string());
        bad.enter(CyclePhase::Applying);
        bad.fail_all(vec!["invite b@example.com: boom".to_string()]);
        cycle.organizations.push(bad);

        assert!(!cycle.is_success());
        assert_eq!(cycle.succeeded_count(), 1);
        assert_eq!(cycle.failed().count(), 1);
        assert_eq!(cycle.total_actions().invite.len(), 2);
    }

    #[test]
    fn test_report_serializes_phases_in_snake_case() {
        let mut report = OrgSyncReport::new("default", "org-1");
        report.enter(CyclePhase::FetchingVault);
        report.fail("x");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"], "failed");
        assert_eq!(json["failed_in"], "fetching_vault");
    }
}
