//! Fuzz target for /proc/self/mountinfo parsing.
//!
//! Tests that mountinfo parsing and mount lookup handle arbitrary input
//! without panicking.

#![no_main]

use gran_core::probe::mountinfo::{find_mount, parse_mountinfo};
use gran_core::probe::DeviceNumber;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let content = String::from_utf8_lossy(data);
    let entries = parse_mountinfo(&content);

    for entry in &entries {
        let _ = entry.dax_mode();
        if let Some(found) = find_mount(&entries, entry.device, &entry.mount_point) {
            assert!(entry.mount_point.starts_with(&found.mount_point));
        }
    }
    let _ = find_mount(&entries, DeviceNumber { major: 0, minor: 0 }, Path::new("/"));
});
