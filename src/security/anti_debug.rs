// src/security/anti_debug.rs
//! Anti-debugging functionality
//!
//! Point-in-time check for a debugger attached to the current process.
//! Nothing here caches: a debugger can attach after an earlier clean check,
//! so callers must ask again every time the answer matters.

use tracing::warn;

/// Checks if the current process is being run under a debugger
///
/// # Returns
/// `true` if a debugger is detected, `false` otherwise (including when the
/// platform probe cannot be evaluated)
///
/// # Platform Support
/// - Windows: Uses IsDebuggerPresent API
/// - Linux: Checks TracerPid in /proc/self/status
/// - macOS: Checks the P_TRACED flag reported by sysctl(KERN_PROC_PID)
/// - Other platforms: Returns false (not implemented)
///
/// A detection is logged at `warn`. The secret gate uses
/// [`debugger_traced`] instead, which emits nothing.
pub fn is_debugger_present() -> bool {
    let result = debugger_traced();
    if result {
        warn!("Debugger detected on {} platform", std::env::consts::OS);
    }
    result
}

/// Same probe as [`is_debugger_present`] without any logging.
pub fn debugger_traced() -> bool {
    #[cfg(target_os = "windows")]
    {
        use windows::Win32::System::Diagnostics::Debug::IsDebuggerPresent;

        // The `as_bool()` method on `BOOL` is a safe conversion.
        unsafe { IsDebuggerPresent().as_bool() }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        // Can't read our own status: no evidence of a tracer.
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_tracer_pid(&status))
            .is_some_and(|pid| pid > 0)
    }

    #[cfg(target_os = "macos")]
    {
        macos_traced()
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "linux",
        target_os = "android",
        target_os = "macos"
    )))]
    {
        false
    }
}

/// Extract the `TracerPid:` value from the contents of `/proc/<pid>/status`.
///
/// Returns `None` when the line is missing or malformed.
pub fn parse_tracer_pid(status: &str) -> Option<u32> {
    for line in status.lines() {
        let Some(raw) = line.strip_prefix("TracerPid:") else {
            continue;
        };
        return raw.trim().parse::<u32>().ok();
    }
    None
}

#[cfg(target_os = "macos")]
fn macos_traced() -> bool {
    const P_TRACED: libc::c_int = 0x0000_0800;

    let mut info: libc::kinfo_proc = unsafe { std::mem::zeroed() };
    let mut size = std::mem::size_of::<libc::kinfo_proc>();
    let mut mib = [
        libc::CTL_KERN,
        libc::KERN_PROC,
        libc::KERN_PROC_PID,
        std::process::id() as libc::c_int,
    ];

    // SAFETY: mib, info and size point to live stack values of the sizes passed.
    let rc = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            &mut info as *mut libc::kinfo_proc as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return false;
    }
    (info.kp_proc.p_flag & P_TRACED) != 0
}
