//! Process memory sampling using the sysinfo crate

use parking_lot::Mutex;
use sysinfo::{ProcessesToUpdate, System};

use super::probes::{MemorySample, MemorySampler, ProbeError};
use super::types::HealthStatus;

/// Usage above this share of the ceiling is unhealthy
pub const MEMORY_UNHEALTHY_PERCENT: f64 = 90.0;
/// Usage above this share of the ceiling is degraded
pub const MEMORY_DEGRADED_PERCENT: f64 = 75.0;

/// Classify memory usage as a percentage of the ceiling
pub fn classify_memory(usage_percent: f64) -> HealthStatus {
    if usage_percent > MEMORY_UNHEALTHY_PERCENT {
        HealthStatus::Unhealthy
    } else if usage_percent > MEMORY_DEGRADED_PERCENT {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Reads this process's resident memory and the host total
pub struct SysinfoSampler {
    system: Mutex<System>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for SysinfoSampler {
    fn sample(&self) -> Result<MemorySample, ProbeError> {
        let pid = sysinfo::get_current_pid().map_err(|e| ProbeError::System(e.to_string()))?;

        let mut sys = self.system.lock();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = sys
            .process(pid)
            .ok_or_else(|| ProbeError::System(format!("process {} not found", pid)))?;

        Ok(MemorySample {
            process_bytes: process.memory(),
            total_bytes: sys.total_memory(),
        })
    }
}
