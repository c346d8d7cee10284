// src/core/watcher.rs

//! Pure filesystem-event filtering logic, decoupled from any real
//! filesystem-notification backend so it is testable without one.
//!
//! The binding to a concrete backend (the `notify` crate) lives in
//! `daemon::fs_watch` and only exists to translate real OS events into the
//! `Event` shape defined here before calling [`dispatch`].

use std::path::{Path, PathBuf};

use crate::core::errors::AntResult;

/// Bitmask flags describing a single filesystem event. Kept as plain `u32`
/// constants (the teacher's stack drops `bitflags` entirely, see
/// DESIGN.md) since this is the one place in the crate that needs a
/// bitmask at all.
pub mod flags {
    pub const CREATED: u32 = 1 << 0;
    pub const REMOVED: u32 = 1 << 1;
    pub const UPDATED: u32 = 1 << 2;
    pub const RENAMED: u32 = 1 << 3;
    pub const IS_FILE: u32 = 1 << 4;
    pub const IS_DIR: u32 = 1 << 5;
    pub const IS_SYMLINK: u32 = 1 << 6;
    pub const OVERFLOW: u32 = 1 << 7;
}

/// The recognised extension set for sequencing-read files. Case-sensitive,
/// per the design's event-filtering rule.
const RECOGNISED_EXTENSIONS: &[&str] = &["fastq", "fq"];

#[derive(Debug, Clone)]
pub struct Event {
    pub path: PathBuf,
    pub flags: u32,
}

impl Event {
    pub fn new(path: impl Into<PathBuf>, flags: u32) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// True iff `event` should become a job: it must carry both `Created` and
/// `IsFile`, must not carry `IsDir` or `IsSymLink`, and its final extension
/// must be exactly `fastq` or `fq`. Directories, symlinks, and attribute
/// changes are always ignored.
pub fn accepts(event: &Event) -> bool {
    if !event.has(flags::CREATED) || !event.has(flags::IS_FILE) {
        return false;
    }
    if event.has(flags::IS_DIR) || event.has(flags::IS_SYMLINK) {
        return false;
    }
    matches_recognised_extension(&event.path)
}

fn matches_recognised_extension(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => RECOGNISED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Filters `event` through [`accepts`] and, if accepted, calls `submit`
/// with its path. Submission failure is logged and the event is dropped —
/// there is no retry.
pub fn dispatch<F>(event: &Event, mut submit: F)
where
    F: FnMut(&Path) -> AntResult<()>,
{
    if !accepts(event) {
        return;
    }
    if let Err(err) = submit(&event.path) {
        tracing::warn!(
            component = "watcher",
            path = %event.path.display(),
            error = %err,
            "job submission failed; event dropped"
        );
    }
}
