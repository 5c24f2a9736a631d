//! Capability detection against the live system.

use super::mapping::try_map_sync;
use super::mountinfo::{find_mount, parse_mountinfo};
use super::sysfs::{is_device_dax, persistence_domain};
use super::{
    CapabilityFacts, CapabilityProber, DeviceNumber, MountFacts, ProbeError, ProbeRoots,
    StorageObject,
};
use crate::logging::Stage;
use gran_config::ProbeSettings;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::{debug, info, info_span, trace};

/// Prober reading procfs, sysfs and the target itself.
#[derive(Debug, Clone)]
pub struct SystemProber {
    roots: ProbeRoots,
    map_probe: bool,
}

impl Default for SystemProber {
    fn default() -> Self {
        SystemProber {
            roots: ProbeRoots::default(),
            map_probe: true,
        }
    }
}

impl SystemProber {
    pub fn new(roots: ProbeRoots, map_probe: bool) -> Self {
        SystemProber { roots, map_probe }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Self {
        SystemProber::new(ProbeRoots::from(settings), settings.map_probe)
    }

    pub fn roots(&self) -> &ProbeRoots {
        &self.roots
    }
}

impl CapabilityProber for SystemProber {
    fn probe(&self, path: &Path) -> Result<CapabilityFacts, ProbeError> {
        let span = info_span!("probe", stage = %Stage::Probe, path = %path.display());
        let _guard = span.enter();
        info!("probing capabilities");
        let facts = probe_path(self, path)?;
        info!(
            object = %facts.object,
            device = %facts.device,
            device_dax = facts.device_dax,
            map_sync = ?facts.map_sync,
            domain = %facts.persistence_domain,
            "capability probe complete"
        );
        Ok(facts)
    }
}

#[cfg(target_os = "linux")]
fn probe_path(prober: &SystemProber, path: &Path) -> Result<CapabilityFacts, ProbeError> {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    // stat first: opening a FIFO would block.
    let meta = fs::metadata(path).map_err(|e| ProbeError::inaccessible(path, e))?;
    let file_type = meta.file_type();
    let object = if file_type.is_dir() {
        StorageObject::Directory
    } else if file_type.is_file() {
        StorageObject::RegularFile
    } else if file_type.is_char_device() {
        StorageObject::CharDevice
    } else if file_type.is_block_device() {
        StorageObject::BlockDevice
    } else {
        return Err(ProbeError::unsupported(
            path,
            "not a directory, regular file or device",
        ));
    };
    trace!(path = %path.display(), object = %object, "object kind");

    // Opening a tty or watchdog node can block or arm it, so only
    // device-DAX character devices are ever opened.
    if object == StorageObject::CharDevice {
        let device = DeviceNumber::from_dev(meta.rdev());
        if !is_device_dax(&prober.roots.sys_root, device) {
            return Err(ProbeError::unsupported(
                path,
                format!("character device {} is not a device-DAX instance", device),
            ));
        }
    }

    // Held for the rest of the probe and closed on every return path.
    let file = open_read_only(path)?;

    let (device, device_dax, mount) = match object {
        StorageObject::CharDevice => (DeviceNumber::from_dev(meta.rdev()), true, None),
        StorageObject::BlockDevice => (DeviceNumber::from_dev(meta.rdev()), false, None),
        StorageObject::Directory | StorageObject::RegularFile => {
            let device = DeviceNumber::from_dev(meta.dev());
            let mount = lookup_mount(prober, path, device)?;
            (device, false, Some(mount))
        }
    };

    let map_sync = if prober.map_probe && object == StorageObject::RegularFile && meta.len() > 0 {
        let outcome = try_map_sync(&file, meta.len());
        debug!(path = %path.display(), outcome = %outcome, "MAP_SYNC trial");
        Some(outcome.supported())
    } else {
        None
    };
    drop(file);

    Ok(CapabilityFacts {
        path: path.to_path_buf(),
        object,
        device,
        device_dax,
        mount,
        map_sync,
        persistence_domain: persistence_domain(&prober.roots.sys_root),
        probed_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Read-only, non-blocking open of the probe target.
#[cfg(target_os = "linux")]
fn open_read_only(path: &Path) -> Result<File, ProbeError> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| ProbeError::inaccessible(path, e))
}

#[cfg(not(target_os = "linux"))]
fn probe_path(_prober: &SystemProber, path: &Path) -> Result<CapabilityFacts, ProbeError> {
    fs::metadata(path).map_err(|e| ProbeError::inaccessible(path, e))?;
    Err(ProbeError::unsupported(
        path,
        "medium detection is only implemented for Linux",
    ))
}

/// Find the mount covering a directory or regular file.
#[cfg(target_os = "linux")]
fn lookup_mount(
    prober: &SystemProber,
    path: &Path,
    device: DeviceNumber,
) -> Result<MountFacts, ProbeError> {
    let mountinfo_path = prober.roots.proc_root.join("self").join("mountinfo");
    let content = fs::read_to_string(&mountinfo_path).map_err(|e| {
        ProbeError::unsupported(
            path,
            format!("cannot read {}: {}", mountinfo_path.display(), e),
        )
    })?;
    let entries = parse_mountinfo(&content);

    let canonical = fs::canonicalize(path).map_err(|e| ProbeError::inaccessible(path, e))?;
    let entry = find_mount(&entries, device, &canonical).ok_or_else(|| {
        ProbeError::unsupported(path, format!("no mount covers {}", canonical.display()))
    })?;

    debug!(
        path = %path.display(),
        mount_point = %entry.mount_point.display(),
        fs_type = %entry.fs_type,
        "covering mount"
    );

    Ok(MountFacts {
        mount_point: entry.mount_point.clone(),
        fs_type: entry.fs_type.clone(),
        source: entry.source.clone(),
        dax: entry.dax_mode(),
    })
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::probe::{DaxMode, PersistenceDomain};
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    /// A fake /proc + /sys pair whose mountinfo covers `target`.
    fn fixture_roots(target: &Path, options: &str) -> (TempDir, ProbeRoots) {
        let scratch = TempDir::new().unwrap();
        let proc_root = scratch.path().join("proc");
        let sys_root = scratch.path().join("sys");
        fs::create_dir_all(proc_root.join("self")).unwrap();
        fs::create_dir_all(&sys_root).unwrap();

        let dev = DeviceNumber::from_dev(fs::metadata(target).unwrap().dev());
        let mount_point = fs::canonicalize(target).unwrap();
        let mountinfo = format!(
            "1 0 {} / {} rw,relatime - ext4 /dev/pmem0 {}\n",
            dev,
            mount_point.display(),
            options
        );
        fs::write(proc_root.join("self/mountinfo"), mountinfo).unwrap();

        (scratch, ProbeRoots { proc_root, sys_root })
    }

    #[test]
    fn test_probe_directory_with_dax_mount() {
        let target = TempDir::new().unwrap();
        let (_scratch, roots) = fixture_roots(target.path(), "rw,dax=always");
        let prober = SystemProber::new(roots, true);

        let facts = prober.probe(target.path()).unwrap();
        assert_eq!(facts.object, StorageObject::Directory);
        assert!(!facts.device_dax);
        assert_eq!(facts.mount.as_ref().unwrap().dax, DaxMode::Always);
        assert_eq!(facts.map_sync, None);
        assert_eq!(facts.persistence_domain, PersistenceDomain::Unknown);
    }

    #[test]
    fn test_probe_missing_path_is_inaccessible() {
        let target = TempDir::new().unwrap();
        let prober = SystemProber::default();
        let err = prober.probe(&target.path().join("absent")).unwrap_err();
        assert!(matches!(err, ProbeError::Inaccessible { .. }));
    }

    #[test]
    fn test_probe_without_mountinfo_is_unsupported() {
        let target = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let roots = ProbeRoots {
            proc_root: scratch.path().join("proc"),
            sys_root: scratch.path().join("sys"),
        };
        let err = SystemProber::new(roots, false).probe(target.path()).unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedMedium { .. }));
    }

    #[test]
    fn test_probe_empty_file_skips_map_trial() {
        let target = TempDir::new().unwrap();
        let file = target.path().join("pool");
        fs::write(&file, b"").unwrap();
        let (_scratch, roots) = fixture_roots(target.path(), "rw");

        let facts = SystemProber::new(roots, true).probe(&file).unwrap();
        assert_eq!(facts.object, StorageObject::RegularFile);
        assert_eq!(facts.map_sync, None);
    }

    #[test]
    fn test_probe_map_trial_disabled() {
        let target = TempDir::new().unwrap();
        let file = target.path().join("pool");
        fs::write(&file, vec![0u8; 4096]).unwrap();
        let (_scratch, roots) = fixture_roots(target.path(), "rw");

        let facts = SystemProber::new(roots, false).probe(&file).unwrap();
        assert_eq!(facts.map_sync, None);
    }

    #[test]
    fn test_probe_fifo_is_unsupported() {
        let target = TempDir::new().unwrap();
        let fifo = target.path().join("fifo");
        let c_path = std::ffi::CString::new(fifo.as_os_str().as_encoded_bytes()).unwrap();
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
        assert_eq!(rc, 0);

        let err = SystemProber::default().probe(&fifo).unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedMedium { .. }));
    }

    /// Character device node for a major number no driver claims; opening
    /// it fails with ENXIO. None when the caller may not create nodes.
    fn unbound_char_device(dir: &Path) -> Option<(std::path::PathBuf, DeviceNumber)> {
        let node = dir.join("chr");
        let c_path = std::ffi::CString::new(node.as_os_str().as_encoded_bytes()).unwrap();
        let rc = unsafe {
            libc::mknod(c_path.as_ptr(), libc::S_IFCHR | 0o600, libc::makedev(240, 99))
        };
        (rc == 0).then(|| (node, DeviceNumber { major: 240, minor: 99 }))
    }

    #[test]
    fn test_non_dax_char_device_rejected_before_open() {
        let target = TempDir::new().unwrap();
        let Some((node, _)) = unbound_char_device(target.path()) else {
            return;
        };
        let (_scratch, roots) = fixture_roots(target.path(), "rw");

        // An open attempt would surface ENXIO as Inaccessible.
        let err = SystemProber::new(roots, true).probe(&node).unwrap_err();
        assert!(
            matches!(err, ProbeError::UnsupportedMedium { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_dax_char_device_is_opened() {
        let target = TempDir::new().unwrap();
        let Some((node, device)) = unbound_char_device(target.path()) else {
            return;
        };
        let (scratch, roots) = fixture_roots(target.path(), "rw");

        let char_dir = roots.sys_root.join("dev/char").join(device.to_string());
        let dax_class = scratch.path().join("sys/class/dax");
        fs::create_dir_all(&char_dir).unwrap();
        fs::create_dir_all(&dax_class).unwrap();
        std::os::unix::fs::symlink(&dax_class, char_dir.join("subsystem")).unwrap();

        let err = SystemProber::new(roots, true).probe(&node).unwrap_err();
        assert!(
            matches!(err, ProbeError::Inaccessible { .. }),
            "unexpected error: {err}"
        );
    }
}
