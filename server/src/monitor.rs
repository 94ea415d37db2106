//! Process-level metrics sampler.
//!
//! ## Data sources
//!
//! | Field            | Source                                                |
//! |------------------|-------------------------------------------------------|
//! | `memory_bytes`   | `VmRSS` in `/proc/self/status` (Linux), else `getrusage` peak RSS |
//! | `uptime_seconds` | monotonic clock since the monitor was created         |
//!
//! Sampling never fails: a metric that can't be read is reported as `0`.

use std::time::Instant;

use serde::Serialize;

/// Read-only sampler, cheap to clone.
#[derive(Debug, Clone, Copy)]
pub struct SystemMonitor {
    started: Instant,
}

/// One sample of process metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    pub memory_bytes: u64,
    pub uptime_seconds: u64,
}

impl SystemMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Take a fresh sample.
    #[must_use]
    pub fn sample(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            memory_bytes: resident_memory_bytes(),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> u64 {
    match std::fs::read_to_string("/proc/self/status") {
        Ok(status) => parse_vm_rss(&status).unwrap_or_else(peak_rss_bytes),
        Err(_) => peak_rss_bytes(),
    }
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> u64 {
    peak_rss_bytes()
}

/// Parse `VmRSS` (reported in kB) from `/proc/self/status` content, in bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix("VmRSS:")?;
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb * 1024)
    })
}

/// Peak resident set size via `getrusage(RUSAGE_SELF)`, or 0 on failure.
#[cfg(unix)]
fn peak_rss_bytes() -> u64 {
    use std::mem::MaybeUninit;

    let mut usage = MaybeUninit::<libc::rusage>::uninit();

    // SAFETY: getrusage writes a full rusage struct into properly aligned
    // memory we own; RUSAGE_SELF is always a valid target.
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if ret != 0 {
        return 0;
    }

    // SAFETY: getrusage returned 0, so usage is fully initialized.
    let usage = unsafe { usage.assume_init() };
    let max_rss = u64::try_from(usage.ru_maxrss).unwrap_or(0);

    // macOS reports bytes, everything else kilobytes.
    if cfg!(target_os = "macos") {
        max_rss
    } else {
        max_rss * 1024
    }
}

#[cfg(not(unix))]
fn peak_rss_bytes() -> u64 {
    0
}
