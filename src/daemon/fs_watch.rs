// src/daemon/fs_watch.rs

//! Binds the `notify` crate to the pure `core::watcher` event model. This
//! is the only place real filesystem events become `core::watcher::Event`
//! values — the filter logic itself never sees `notify` types.
//!
//! `notify` is the idiomatic choice for this: the same crate turns up
//! pinned in the wider corpus (`other_examples/manifests/freddiehaddad-oxidized`).

use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};

use crate::core::errors::{AntError, AntResult};
use crate::core::watcher::{dispatch, flags, Event};
use crate::daemon::signals::ShutdownSignal;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn translate(event: NotifyEvent) -> Vec<Event> {
    let mut bits = 0u32;
    match &event.kind {
        EventKind::Create(_) => bits |= flags::CREATED,
        EventKind::Remove(_) => bits |= flags::REMOVED,
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => bits |= flags::RENAMED,
        EventKind::Modify(_) => bits |= flags::UPDATED,
        EventKind::Other => bits |= flags::OVERFLOW,
        EventKind::Access(_) | EventKind::Any => {}
    }

    event
        .paths
        .into_iter()
        .map(|path| {
            let mut path_bits = bits;
            if path.is_symlink() {
                path_bits |= flags::IS_SYMLINK;
            } else if path.is_dir() {
                path_bits |= flags::IS_DIR;
            } else if path.is_file() {
                path_bits |= flags::IS_FILE;
            }
            Event::new(path, path_bits)
        })
        .collect()
}

/// Blocks the calling thread inside the filesystem-monitor callback loop
/// until `shutdown` is triggered, dispatching accepted events to `submit`.
pub fn run_watch_loop<F>(watch_dir: &Path, shutdown: &ShutdownSignal, mut submit: F) -> AntResult<()>
where
    F: FnMut(&Path) -> AntResult<()>,
{
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
        let _ = tx.send(res);
    })
    .map_err(|e| AntError::AccessDenied(format!("failed to create filesystem watcher: {e}")))?;

    watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| {
            AntError::AccessDenied(format!("failed to watch {}: {e}", watch_dir.display()))
        })?;

    while !shutdown.is_triggered() {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                for core_event in translate(event) {
                    dispatch(&core_event, &mut submit);
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(component = "watcher", error = %e, "filesystem watch error");
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
