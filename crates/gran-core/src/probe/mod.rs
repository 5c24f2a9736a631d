//! Capability probing for persistent-memory targets.
//!
//! This module inspects the storage object behind a path and reports raw
//! facts about it:
//! - Object kind (directory, regular file, character or block device)
//! - Device-DAX membership of character devices (sysfs `subsystem` link)
//! - The covering mount and its DAX mode (`/proc/self/mountinfo`)
//! - Whether a transient `MAP_SYNC` mapping is accepted
//! - The platform persistence domain of NVDIMM regions
//!
//! Probing is read-only and never cached: facts are computed fresh for every
//! call because the same host can expose different media on different mounts.
//! Turning facts into a granularity is the resolver's job.

mod detect;
mod mapping;
pub mod mountinfo;
pub mod sysfs;

pub use detect::SystemProber;
pub use mapping::MapSyncOutcome;
pub use mountinfo::{DaxMode, MountEntry};
pub use sysfs::PersistenceDomain;

use gran_common::ErrorCategory;
use gran_config::ProbeSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors during capability probing.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot inspect {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot classify medium backing {path}: {reason}")]
    UnsupportedMedium { path: PathBuf, reason: String },
}

impl ProbeError {
    pub(crate) fn inaccessible(path: &Path, source: std::io::Error) -> Self {
        ProbeError::Inaccessible {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        ProbeError::UnsupportedMedium {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::Inaccessible { .. } => ErrorCategory::Access,
            ProbeError::UnsupportedMedium { .. } => ErrorCategory::Medium,
        }
    }
}

/// Anything that can produce capability facts for a path.
///
/// The resolver is generic over this so detection can be exercised against
/// fixtures or replaced entirely in tests.
pub trait CapabilityProber {
    fn probe(&self, path: &Path) -> Result<CapabilityFacts, ProbeError>;
}

/// Kind of filesystem object that was probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageObject {
    Directory,
    RegularFile,
    CharDevice,
    BlockDevice,
}

impl std::fmt::Display for StorageObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageObject::Directory => write!(f, "directory"),
            StorageObject::RegularFile => write!(f, "regular file"),
            StorageObject::CharDevice => write!(f, "character device"),
            StorageObject::BlockDevice => write!(f, "block device"),
        }
    }
}

/// Linux device number split into major and minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl DeviceNumber {
    /// Decode a `dev_t` using the glibc/kernel userspace encoding.
    pub fn from_dev(dev: u64) -> Self {
        let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & !0xfff);
        let minor = (dev & 0xff) | ((dev >> 12) & !0xff);
        DeviceNumber {
            major: major as u32,
            minor: minor as u32,
        }
    }
}

impl std::fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// The mount covering a probed directory or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountFacts {
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub source: String,
    pub dax: DaxMode,
}

/// Raw capability snapshot for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFacts {
    /// Path that was probed, as given.
    pub path: PathBuf,

    /// Kind of object at the path.
    pub object: StorageObject,

    /// Backing device (`st_dev`), or the device node itself (`st_rdev`).
    pub device: DeviceNumber,

    /// Character device belonging to the `dax` subsystem.
    pub device_dax: bool,

    /// Covering mount; absent for device nodes.
    pub mount: Option<MountFacts>,

    /// Outcome of the MAP_SYNC trial; absent when no trial was made.
    pub map_sync: Option<bool>,

    /// Persistence domain reported by NVDIMM regions.
    pub persistence_domain: PersistenceDomain,

    /// When the facts were gathered (RFC 3339).
    pub probed_at: String,
}

/// Roots of the kernel metadata trees the prober reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRoots {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for ProbeRoots {
    fn default() -> Self {
        ProbeRoots {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

impl From<&ProbeSettings> for ProbeRoots {
    fn from(settings: &ProbeSettings) -> Self {
        ProbeRoots {
            proc_root: settings.proc_root.clone(),
            sys_root: settings.sys_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_number_decode() {
        // makedev(259, 3) with the glibc encoding
        let dev: u64 = (3 & 0xff) | ((259 & 0xfff) << 8);
        assert_eq!(DeviceNumber::from_dev(dev), DeviceNumber { major: 259, minor: 3 });

        // Large minors spill into the high bits.
        let minor: u64 = 0x12345;
        let dev = (minor & 0xff) | ((minor & !0xff) << 12) | (8 << 8);
        assert_eq!(
            DeviceNumber::from_dev(dev),
            DeviceNumber { major: 8, minor: 0x12345 }
        );
    }

    #[test]
    fn test_device_number_display() {
        assert_eq!(DeviceNumber { major: 252, minor: 0 }.to_string(), "252:0");
    }

    #[test]
    fn test_probe_error_categories() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(
            ProbeError::inaccessible(Path::new("/x"), io).category(),
            ErrorCategory::Access
        );
        assert_eq!(
            ProbeError::unsupported(Path::new("/x"), "fifo").category(),
            ErrorCategory::Medium
        );
    }

    #[test]
    fn test_roots_from_settings() {
        let settings = ProbeSettings {
            proc_root: PathBuf::from("/fixture/proc"),
            sys_root: PathBuf::from("/fixture/sys"),
            map_probe: false,
        };
        let roots = ProbeRoots::from(&settings);
        assert_eq!(roots.proc_root, PathBuf::from("/fixture/proc"));
        assert_eq!(roots.sys_root, PathBuf::from("/fixture/sys"));
    }
}
