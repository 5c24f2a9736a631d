//! Parser for `/proc/[pid]/mountinfo`.
//!
//! Line format (see proc(5)):
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! (1)(2)(3)   (4)   (5)      (6)      (7)   (8) (9)   (10)         (11)
//! ```
//!
//! Optional fields (7) are terminated by a lone `-`. Paths escape space,
//! tab, newline and backslash as octal sequences (`\040`, `\011`, `\012`,
//! `\134`).

use super::DeviceNumber;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One parsed mountinfo line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_id: u32,
    pub parent_id: u32,
    pub device: DeviceNumber,
    pub root: PathBuf,
    pub mount_point: PathBuf,
    pub mount_options: Vec<String>,
    pub fs_type: String,
    pub source: String,
    pub super_options: Vec<String>,
}

/// DAX mode of a mount, from its per-mount and superblock options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaxMode {
    /// `dax` or `dax=always`: every file is accessed directly.
    Always,
    /// `dax=inode`: per-file attribute decides.
    Inode,
    /// No DAX option, or `dax=never`.
    Never,
}

impl MountEntry {
    /// DAX mode implied by this mount's options.
    pub fn dax_mode(&self) -> DaxMode {
        let mut mode = DaxMode::Never;
        for option in self.mount_options.iter().chain(self.super_options.iter()) {
            match option.as_str() {
                "dax" | "dax=always" => return DaxMode::Always,
                "dax=inode" => mode = DaxMode::Inode,
                _ => {}
            }
        }
        mode
    }
}

/// Parse mountinfo content, skipping malformed lines.
pub fn parse_mountinfo(content: &str) -> Vec<MountEntry> {
    content.lines().filter_map(parse_mountinfo_line).collect()
}

/// Parse a single mountinfo line.
pub fn parse_mountinfo_line(line: &str) -> Option<MountEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let separator = fields.iter().position(|f| *f == "-")?;
    if separator < 6 || fields.len() < separator + 3 {
        return None;
    }

    let mount_id = fields[0].parse().ok()?;
    let parent_id = fields[1].parse().ok()?;
    let (major, minor) = fields[2].split_once(':')?;
    let device = DeviceNumber {
        major: major.parse().ok()?,
        minor: minor.parse().ok()?,
    };

    Some(MountEntry {
        mount_id,
        parent_id,
        device,
        root: PathBuf::from(unescape(fields[3])),
        mount_point: PathBuf::from(unescape(fields[4])),
        mount_options: split_options(fields[5]),
        fs_type: fields[separator + 1].to_string(),
        source: unescape(fields[separator + 2]),
        super_options: fields
            .get(separator + 3)
            .map(|s| split_options(s))
            .unwrap_or_default(),
    })
}

fn split_options(s: &str) -> Vec<String> {
    s.split(',')
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode the kernel's octal escapes.
fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Find the mount covering `path`.
///
/// Entries whose device number matches are preferred, taking the longest
/// mount point that is a prefix of `path`; later entries win ties because
/// they are stacked on top. When no device matches (btrfs subvolumes report
/// anonymous device numbers), the longest prefix overall is used.
pub fn find_mount<'a>(
    entries: &'a [MountEntry],
    device: DeviceNumber,
    path: &Path,
) -> Option<&'a MountEntry> {
    let covering = |e: &&MountEntry| path.starts_with(&e.mount_point);
    let longest = |best: Option<&'a MountEntry>, e: &'a MountEntry| match best {
        Some(b) if b.mount_point.as_os_str().len() > e.mount_point.as_os_str().len() => Some(b),
        _ => Some(e),
    };

    let by_device = entries
        .iter()
        .filter(|e| e.device == device)
        .filter(covering)
        .fold(None, longest);

    by_device.or_else(|| entries.iter().filter(covering).fold(None, longest))
}
