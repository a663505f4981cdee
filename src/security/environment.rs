// src/security/environment.rs
//! Combined environment assessment
//!
//! Runs every detection signal once and reports them together, so a host can
//! decide at startup whether to keep going.

use tracing::{info, warn};

use crate::security::integrity::{self_integrity_check_with, EXPECTED_SELF_DIGEST};
use crate::security::process_scan::{
    find_suspicious_processes, ProcessIdentity, ProcessIntrospector, SystemIntrospector,
    DEFAULT_PROCESS_BLOCKLIST,
};

/// Snapshot of the detection signals at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub self_integrity_ok: bool,
    pub debugger_attached: bool,
    pub suspicious_processes: Vec<ProcessIdentity>,
}

impl EnvironmentReport {
    /// Integrity intact, no debugger, nothing on the blocklist running.
    pub fn is_safe(&self) -> bool {
        self.self_integrity_ok && !self.debugger_attached && self.suspicious_processes.is_empty()
    }
}

/// Evaluate all signals through `introspector`.
pub fn assess_environment<I, S>(
    introspector: &I,
    expected_self_digest: Option<&str>,
    blocklist: &[S],
) -> EnvironmentReport
where
    I: ProcessIntrospector + ?Sized,
    S: AsRef<str>,
{
    let report = EnvironmentReport {
        self_integrity_ok: self_integrity_check_with(introspector, expected_self_digest),
        debugger_attached: introspector.debugger_attached(),
        suspicious_processes: find_suspicious_processes(introspector, blocklist),
    };

    if report.is_safe() {
        info!("Environment assessment passed");
    } else {
        warn!(
            self_integrity_ok = report.self_integrity_ok,
            debugger_attached = report.debugger_attached,
            suspicious = report.suspicious_processes.len(),
            "Environment assessment failed"
        );
    }
    report
}

/// Assess the real system with the build-time digest and default blocklist.
pub fn is_safe_environment() -> bool {
    assess_environment(&SystemIntrospector, EXPECTED_SELF_DIGEST, &DEFAULT_PROCESS_BLOCKLIST)
        .is_safe()
}
