// src/security/process_scan.rs
//! Process introspection
//!
//! Detection signals (own executable, debugger presence, the system process
//! table) sit behind the [`ProcessIntrospector`] capability so the policy
//! built on top of them can be exercised without a real operating system.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::errors::GuardError;
use crate::security::anti_debug::debugger_traced;

/// Executable names of common reverse-engineering tools.
pub const DEFAULT_PROCESS_BLOCKLIST: [&str; 7] = [
    "ollydbg.exe",
    "x64dbg.exe",
    "ida.exe",
    "ida64.exe",
    "cheatengine.exe",
    "scylla.exe",
    "procexp.exe",
];

/// A running process: numeric id plus its resolved base executable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub name: String,
    pub exe: Option<PathBuf>,
}

impl ProcessIdentity {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self { pid, name: name.into(), exe: None }
    }

    /// Case-insensitive match of the base name against a blocklist.
    pub fn matches_any<S: AsRef<str>>(&self, blocklist: &[S]) -> bool {
        blocklist.iter().any(|entry| entry.as_ref().eq_ignore_ascii_case(&self.name))
    }
}

/// OS-level trust signals used by the secret gate and the scanners.
pub trait ProcessIntrospector {
    /// Full path of the running process's own executable.
    fn current_executable(&self) -> Result<PathBuf, GuardError>;

    /// Whether a debugger is attached right now. Never cached, never logs.
    fn debugger_attached(&self) -> bool;

    /// Snapshot of every process visible system-wide.
    fn processes(&self) -> Result<Vec<ProcessIdentity>, GuardError>;
}

/// Introspector backed by the real operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIntrospector;

impl ProcessIntrospector for SystemIntrospector {
    fn current_executable(&self) -> Result<PathBuf, GuardError> {
        std::env::current_exe()
            .map_err(|e| GuardError::Environment(format!("resolve current executable: {}", e)))
    }

    fn debugger_attached(&self) -> bool {
        debugger_traced()
    }

    fn processes(&self) -> Result<Vec<ProcessIdentity>, GuardError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(GuardError::Environment(
                "process enumeration is not supported on this platform".to_string(),
            ));
        }

        let mut sys = sysinfo::System::new();
        sys.refresh_processes();

        let snapshot: Vec<ProcessIdentity> = sys
            .processes()
            .iter()
            .map(|(pid, proc_)| {
                let exe = proc_.exe().map(Path::to_path_buf);
                let name = exe
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| proc_.name().to_string());
                ProcessIdentity { pid: pid.as_u32(), name, exe }
            })
            .collect();

        // Our own process is always present; an empty table means the probe failed.
        if snapshot.is_empty() {
            return Err(GuardError::Environment("process table is empty".to_string()));
        }
        Ok(snapshot)
    }
}

/// Every enumerated process whose base name is on the blocklist.
///
/// Enumeration failure yields an empty list: absence of evidence is treated
/// as "nothing suspicious" so a broken probe never locks the host out.
pub fn find_suspicious_processes<I, S>(introspector: &I, blocklist: &[S]) -> Vec<ProcessIdentity>
where
    I: ProcessIntrospector + ?Sized,
    S: AsRef<str>,
{
    match introspector.processes() {
        Ok(list) => list.into_iter().filter(|p| p.matches_any(blocklist)).collect(),
        Err(err) => {
            warn!("Process enumeration failed, assuming no suspicious processes: {}", err);
            Vec::new()
        }
    }
}

/// True as soon as any process name matches the blocklist (case-insensitive).
///
/// Fails open: an enumeration error returns `false`.
pub fn scan_for_processes<I, S>(introspector: &I, blocklist: &[S]) -> bool
where
    I: ProcessIntrospector + ?Sized,
    S: AsRef<str>,
{
    let list = match introspector.processes() {
        Ok(list) => list,
        Err(err) => {
            warn!("Process enumeration failed, assuming no suspicious processes: {}", err);
            return false;
        }
    };

    match list.iter().find(|p| p.matches_any(blocklist)) {
        Some(hit) => {
            warn!(pid = hit.pid, name = %hit.name, "Suspicious process detected");
            true
        }
        None => {
            debug!("Scanned {} processes, none on the blocklist", list.len());
            false
        }
    }
}

/// Scan the real system process table against [`DEFAULT_PROCESS_BLOCKLIST`].
pub fn detect_suspicious_processes() -> bool {
    scan_for_processes(&SystemIntrospector, &DEFAULT_PROCESS_BLOCKLIST)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTable(Result<Vec<ProcessIdentity>, ()>);

    impl ProcessIntrospector for FixedTable {
        fn current_executable(&self) -> Result<PathBuf, GuardError> {
            Ok(PathBuf::from("/opt/app/hostguard"))
        }

        fn debugger_attached(&self) -> bool {
            false
        }

        fn processes(&self) -> Result<Vec<ProcessIdentity>, GuardError> {
            self.0
                .clone()
                .map_err(|_| GuardError::Environment("enumeration failed".to_string()))
        }
    }

    fn table(names: &[&str]) -> FixedTable {
        FixedTable(Ok(names
            .iter()
            .enumerate()
            .map(|(i, n)| ProcessIdentity::new(i as u32 + 1, *n))
            .collect()))
    }

    #[test]
    fn test_scan_matches_case_insensitively() {
        let sys = table(&["explorer.exe", "X64DBG.EXE"]);
        assert!(scan_for_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST));
    }

    #[test]
    fn test_scan_no_match() {
        let sys = table(&["explorer.exe", "notepad.exe"]);
        assert!(!scan_for_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST));
    }

    #[test]
    fn test_scan_requires_exact_name() {
        let sys = table(&["x64dbg.exe.bak", "my_ida.exe"]);
        assert!(!scan_for_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST));
    }

    #[test]
    fn test_scan_enumeration_failure_fails_open() {
        let sys = FixedTable(Err(()));
        assert!(!scan_for_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST));
        assert!(find_suspicious_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST).is_empty());
    }

    #[test]
    fn test_find_returns_all_hits() {
        let sys = table(&["ida64.exe", "bash", "CheatEngine.exe"]);
        let hits = find_suspicious_processes(&sys, &DEFAULT_PROCESS_BLOCKLIST);
        let names: Vec<&str> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ida64.exe", "CheatEngine.exe"]);
    }

    #[test]
    fn test_empty_blocklist_never_matches() {
        let sys = table(&["x64dbg.exe"]);
        let empty: [&str; 0] = [];
        assert!(!scan_for_processes(&sys, &empty));
    }

    #[test]
    fn test_system_introspector_sees_processes() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        let list = SystemIntrospector.processes().unwrap();
        assert!(list.iter().any(|p| p.pid == std::process::id()));
    }
}
