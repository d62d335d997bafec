//! Prometheus metrics for Wardensync
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Duration;

use crate::apply::ActionKind;

/// Metric names
pub mod names {
    pub const ACTIONS_TOTAL: &str = "wardensync_actions_total";
    pub const CYCLES_TOTAL: &str = "wardensync_cycles_total";
    pub const CONSECUTIVE_FAILURES: &str = "wardensync_consecutive_failures";
    pub const CYCLE_DURATION_SECONDS: &str = "wardensync_cycle_duration_seconds";
}

/// Register descriptions with the installed recorder
pub fn describe() {
    describe_counter!(
        names::ACTIONS_TOTAL,
        Unit::Count,
        "Membership actions attempted, by action and outcome"
    );
    describe_counter!(names::CYCLES_TOTAL, Unit::Count, "Sync cycles run, by outcome");
    describe_gauge!(
        names::CONSECUTIVE_FAILURES,
        Unit::Count,
        "Failed cycles since the last successful one"
    );
    describe_histogram!(
        names::CYCLE_DURATION_SECONDS,
        Unit::Seconds,
        "Wall time of a sync cycle"
    );
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

pub fn record_action(action: ActionKind, success: bool) {
    counter!(
        names::ACTIONS_TOTAL,
        "action" => action.as_str(),
        "outcome" => outcome(success)
    )
    .increment(1);
}

pub fn record_cycle(success: bool, duration: Duration) {
    counter!(names::CYCLES_TOTAL, "outcome" => outcome(success)).increment(1);
    histogram!(names::CYCLE_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn set_consecutive_failures(count: u32) {
    gauge!(names::CONSECUTIVE_FAILURES).set(count as f64);
}
