//! Transient MAP_SYNC mapping trial.
//!
//! The kernel accepts `MAP_SHARED_VALIDATE | MAP_SYNC` only for files whose
//! filesystem maps persistent memory directly (fs-DAX). Everything else
//! fails with `EOPNOTSUPP`, and kernels that predate the flag reject
//! `MAP_SHARED_VALIDATE` with `EINVAL`.
//!
//! The mapping is read-only, at most one page long, and is unmapped before
//! the trial returns.

use std::fs::File;

/// Result of a MAP_SYNC trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSyncOutcome {
    /// The mapping was established.
    Supported,
    /// The kernel refused the flag for this file.
    Unsupported,
    /// mmap failed for another reason (errno).
    Failed(i32),
}

impl MapSyncOutcome {
    /// Only a successful mapping proves synchronous page faults.
    pub fn supported(self) -> bool {
        matches!(self, MapSyncOutcome::Supported)
    }

    pub(crate) fn from_errno(errno: i32) -> Self {
        if errno == libc::EOPNOTSUPP || errno == libc::EINVAL {
            MapSyncOutcome::Unsupported
        } else {
            MapSyncOutcome::Failed(errno)
        }
    }
}

impl std::fmt::Display for MapSyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapSyncOutcome::Supported => write!(f, "supported"),
            MapSyncOutcome::Unsupported => write!(f, "unsupported"),
            MapSyncOutcome::Failed(errno) => write!(f, "failed (errno {})", errno),
        }
    }
}

/// Attempt a MAP_SYNC mapping of the first page of `file`.
///
/// `file_len` must be non-zero; mapping an empty file is always `EINVAL`.
#[cfg(target_os = "linux")]
pub(crate) fn try_map_sync(file: &File, file_len: u64) -> MapSyncOutcome {
    let len = usize::try_from(file_len.min(page_size())).unwrap_or(4096);
    match TransientMapping::new(file, len) {
        Ok(_mapping) => MapSyncOutcome::Supported,
        Err(e) => MapSyncOutcome::from_errno(e.raw_os_error().unwrap_or(0)),
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn try_map_sync(_file: &File, _file_len: u64) -> MapSyncOutcome {
    MapSyncOutcome::Unsupported
}

#[cfg(target_os = "linux")]
fn page_size() -> u64 {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

// uapi values from <linux/mman.h> / <asm-generic/mman-common.h>.
#[cfg(target_os = "linux")]
const MAP_SHARED_VALIDATE: libc::c_int = 0x03;
#[cfg(target_os = "linux")]
const MAP_SYNC: libc::c_int = 0x80000;

/// A read-only mapping released on drop.
#[cfg(target_os = "linux")]
struct TransientMapping {
    addr: *mut libc::c_void,
    len: usize,
}

#[cfg(target_os = "linux")]
impl TransientMapping {
    fn new(file: &File, len: usize) -> std::io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                MAP_SHARED_VALIDATE | MAP_SYNC,
                file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }
        Ok(TransientMapping { addr, len })
    }
}

#[cfg(target_os = "linux")]
impl Drop for TransientMapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.addr, self.len);
        }
    }
}
