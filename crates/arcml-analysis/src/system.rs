//! Host resource sampling for the health report

use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use sysinfo::{Disks, System};

/// Point-in-time host utilization, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
}

/// Keeps one `System` so CPU usage is measured between consecutive samples
pub struct SystemSampler {
    system: Mutex<System>,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }

    pub fn sample(&self) -> ResourceUsage {
        let (cpu_percent, memory_percent) = {
            let mut system = self.system.lock();
            system.refresh_cpu();
            system.refresh_memory();
            (
                system.global_cpu_info().cpu_usage(),
                percent(system.used_memory(), system.total_memory()),
            )
        };

        ResourceUsage {
            cpu_percent,
            memory_percent,
            disk_percent: root_disk_percent(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn root_disk_percent() -> f32 {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());

    root.map(|d| percent(d.total_space().saturating_sub(d.available_space()),d.total_space()))
        .unwrap_or(0.0)
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}
