//! System statistics collection

use serde::Serialize;
use std::path::Path;
use sysinfo::{Disks, System};

use crate::storage::validation::Root;

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub hostname: String,
    pub os: String,
    pub kernel_version: String,
    pub uptime_secs: u64,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    /// Disk holding the root directory, when it can be identified
    pub disk: Option<DiskStats>,
}

#[derive(Debug, Serialize)]
pub struct CpuStats {
    pub count: usize,
    pub usage_percent: f32,
}

#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

#[derive(Debug, Serialize)]
pub struct DiskStats {
    pub mount_point: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Collect a snapshot. Blocking; call it off the async runtime.
pub fn collect(root: &Root) -> SystemStats {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();

    let memory_total = sys.total_memory();
    let memory_used = sys.used_memory();

    SystemStats {
        hostname: System::host_name().unwrap_or_default(),
        os: System::long_os_version().unwrap_or_default(),
        kernel_version: System::kernel_version().unwrap_or_default(),
        uptime_secs: System::uptime(),
        cpu: CpuStats {
            count: sys.cpus().len(),
            usage_percent: sys.global_cpu_info().cpu_usage(),
        },
        memory: MemoryStats {
            total: memory_total,
            used: memory_used,
            percent: percent(memory_used, memory_total),
        },
        disk: disk_for(root.path()),
    }
}

/// Picks the disk with the longest mount point containing `path`.
fn disk_for(path: &Path) -> Option<DiskStats> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().components().count())?;

    let total = disk.total_space();
    let free = disk.available_space();
    let used = total.saturating_sub(free);

    Some(DiskStats {
        mount_point: disk.mount_point().to_string_lossy().to_string(),
        total,
        used,
        free,
        percent: percent(used, total),
    })
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_collect_reports_memory() {
        let dir = TempDir::new().unwrap();
        let root = Root::new(dir.path()).unwrap();
        let stats = collect(&root);

        assert!(stats.memory.total > 0);
        assert!(stats.memory.percent >= 0.0 && stats.memory.percent <= 100.0);
        if let Some(disk) = stats.disk {
            assert!(root.path().starts_with(&disk.mount_point));
            assert_eq!(disk.used + disk.free, disk.total);
        }
    }
}
