//! sysfs lookups: device-DAX membership and NVDIMM persistence domain.

use super::DeviceNumber;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Power-fail protected domain of the platform's NVDIMM regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceDomain {
    /// CPU caches are flushed on power loss (eADR).
    CpuCache,
    /// Only the memory controller write queues are protected (ADR).
    MemoryController,
    /// No regions, or a region without a readable domain.
    Unknown,
}

impl std::fmt::Display for PersistenceDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceDomain::CpuCache => write!(f, "cpu_cache"),
            PersistenceDomain::MemoryController => write!(f, "memory_controller"),
            PersistenceDomain::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a character device belongs to the `dax` subsystem.
///
/// Reads the `<sys>/dev/char/<maj>:<min>/subsystem` symlink, which points at
/// `.../class/dax` or `.../bus/dax` for device-DAX instances.
pub fn is_device_dax(sys_root: &Path, device: DeviceNumber) -> bool {
    let link = sys_root
        .join("dev")
        .join("char")
        .join(device.to_string())
        .join("subsystem");

    match fs::read_link(&link) {
        Ok(target) => {
            let is_dax = target.file_name().is_some_and(|name| name == "dax");
            trace!(device = %device, target = %target.display(), is_dax, "subsystem link");
            is_dax
        }
        Err(e) => {
            trace!(device = %device, error = %e, "no subsystem link");
            false
        }
    }
}

/// Combine the persistence domains of every NVDIMM region.
///
/// The platform only offers eADR when every region reports `cpu_cache`.
pub fn persistence_domain(sys_root: &Path) -> PersistenceDomain {
    let devices = sys_root.join("bus").join("nd").join("devices");
    let entries = match fs::read_dir(&devices) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %devices.display(), error = %e, "no nd bus");
            return PersistenceDomain::Unknown;
        }
    };

    let mut domains = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("region") {
            continue;
        }
        let domain = fs::read_to_string(entry.path().join("persistence_domain"))
            .map(|s| parse_domain(&s))
            .unwrap_or(PersistenceDomain::Unknown);
        trace!(region = %name.to_string_lossy(), domain = %domain, "region domain");
        domains.push(domain);
    }

    combine_domains(&domains)
}

fn parse_domain(content: &str) -> PersistenceDomain {
    match content.trim() {
        "cpu_cache" => PersistenceDomain::CpuCache,
        "memory_controller" => PersistenceDomain::MemoryController,
        _ => PersistenceDomain::Unknown,
    }
}

fn combine_domains(domains: &[PersistenceDomain]) -> PersistenceDomain {
    if domains.is_empty() || domains.contains(&PersistenceDomain::Unknown) {
        PersistenceDomain::Unknown
    } else if domains.iter().all(|d| *d == PersistenceDomain::CpuCache) {
        PersistenceDomain::CpuCache
    } else {
        PersistenceDomain::MemoryController
    }
}
