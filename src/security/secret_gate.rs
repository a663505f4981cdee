// src/security/secret_gate.rs
//! Secret gate
//!
//! Releases the embedded secret only to the legitimate host executable and
//! only while no debugger is attached. Both signals are re-evaluated on every
//! call. Nothing on this path logs.

use crate::security::process_scan::{ProcessIntrospector, SystemIntrospector};

/// Length of the embedded secret.
pub const SECRET_LEN: usize = 16;

/// Substring the host executable path must contain.
pub const HOST_MARKER: &str = match option_env!("HOSTGUARD_HOST_MARKER") {
    Some(marker) => marker,
    None => "hostguard",
};

const SECRET: [u8; SECRET_LEN] = [
    0x5e, 0x91, 0x2c, 0xd7, 0x08, 0xb3, 0x6a, 0xf4, 0x1d, 0xc0, 0x77, 0x3b, 0xe9, 0x52, 0x86, 0xaf,
];

/// Why the gate refused. [`SecretGate::get_secret`] only reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRefusal {
    BufferTooSmall,
    UnknownHost,
    DebuggerAttached,
}

/// Decides whether the secret may be disclosed to the caller.
#[derive(Debug, Clone)]
pub struct SecretGate<I: ProcessIntrospector> {
    introspector: I,
    host_marker: String,
}

impl SecretGate<SystemIntrospector> {
    /// Gate over the real process with the build-time host marker.
    pub fn system() -> Self {
        Self::new(SystemIntrospector, HOST_MARKER)
    }
}

impl<I: ProcessIntrospector> SecretGate<I> {
    pub fn new(introspector: I, host_marker: impl Into<String>) -> Self {
        Self { introspector, host_marker: host_marker.into() }
    }

    pub fn introspector(&self) -> &I {
        &self.introspector
    }

    /// Evaluate every condition without touching any buffer.
    ///
    /// The buffer length check comes first so undersized requests never
    /// trigger OS probes.
    pub fn check(&self, out_len: usize) -> Result<(), GateRefusal> {
        if out_len < SECRET_LEN {
            return Err(GateRefusal::BufferTooSmall);
        }

        let exe = self.introspector.current_executable().map_err(|_| GateRefusal::UnknownHost)?;
        if self.host_marker.is_empty() || !exe.to_string_lossy().contains(&self.host_marker) {
            return Err(GateRefusal::UnknownHost);
        }

        if self.introspector.debugger_attached() {
            return Err(GateRefusal::DebuggerAttached);
        }
        Ok(())
    }

    /// Copy the secret into `out[..16]` when allowed. On refusal `out` is untouched.
    pub fn get_secret(&self, out: &mut [u8]) -> bool {
        if self.check(out.len()).is_err() {
            return false;
        }
        out[..SECRET_LEN].copy_from_slice(&SECRET);
        true
    }
}

/// Gate the embedded secret for the real running process.
pub fn get_secret(out: &mut [u8]) -> bool {
    SecretGate::system().get_secret(out)
}
