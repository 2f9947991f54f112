#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// Process-level runtime figures reported alongside source health.
pub struct RuntimeMonitor {
    start_time: Instant,
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
}

impl RuntimeMonitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            #[cfg(feature = "cli")]
            system: Mutex::new(System::new_with_specifics(RefreshKind::everything())),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Resident memory of this process in MB, when it can be read.
    #[cfg(feature = "cli")]
    pub fn memory_usage_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        let process = system.process(pid)?;
        Some(process.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    pub fn memory_usage_mb(&self) -> Option<u64> {
        None
    }
}

impl Default for RuntimeMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_advances() {
        let monitor = RuntimeMonitor::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(monitor.uptime() >= Duration::from_millis(5));
    }
}
