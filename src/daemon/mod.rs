// src/daemon/mod.rs

//! Orchestrates the running daemon process: PID registration, the
//! watcher thread, the worker pool, and the main thread's signal-wait
//! loop.
//!
//! Shaped after `spineldb::server`'s `setup()` -> `spawn_all()` ->
//! `connection_loop::run()` sequence, re-expressed synchronously since
//! this daemon's concurrency model is blocking OS threads rather than
//! tokio tasks.

pub mod fs_watch;
pub mod signals;

use std::path::Path;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::core::bigsi::Bigsi;
use crate::core::errors::{AntError, AntResult};
use crate::core::metrics::Metrics;
use crate::core::pipeline;
use crate::core::threadpool::ThreadPool;
use crate::daemon::signals::ShutdownSignal;

/// Runs the daemon until SIGTERM, then drains and exits cleanly.
pub fn run(config_path: &Path, mut config: Config) -> AntResult<()> {
    tracing::info!(
        component = "daemon",
        watch_dir = %config.watch_dir.display(),
        db_dir = %config.db_dir.display(),
        "starting"
    );

    let bigsi = Arc::new(Bigsi::load(&config.db_dir)?);
    let metrics = Arc::new(Metrics::new());
    let pool = Arc::new(ThreadPool::create(config.num_threads)?);
    let shutdown = ShutdownSignal::install()?;

    config.register_pid(config_path, std::process::id())?;

    let kmer_size = config.k;
    let watch_dir = config.watch_dir.clone();
    let watcher_shutdown = shutdown.clone();
    let watcher_pool = pool.clone();
    let watcher_bigsi = bigsi.clone();
    let watcher_metrics = metrics.clone();

    let watcher_handle = thread::Builder::new()
        .name("bigsid-watcher".into())
        .spawn(move || {
            let submit = |path: &Path| {
                let path = path.to_path_buf();
                let bigsi = watcher_bigsi.clone();
                let metrics = watcher_metrics.clone();
                watcher_pool.submit(move || {
                    if let Err(e) = pipeline::query_read_file(&path, &bigsi, kmer_size, &metrics) {
                        tracing::error!(
                            component = "worker",
                            path = %path.display(),
                            error = %e,
                            "job failed"
                        );
                    }
                })
            };
            if let Err(e) = fs_watch::run_watch_loop(&watch_dir, &watcher_shutdown, submit) {
                tracing::error!(component = "watcher", error = %e, "watcher loop exited with error");
            }
        })
        .map_err(|e| AntError::AllocationFailed(format!("failed to spawn watcher thread: {e}")))?;

    shutdown.wait();
    tracing::info!(component = "daemon", "shutdown signal received; draining");

    watcher_handle.join().ok();
    pool.wait_idle();
    config.clear_pid(config_path)?;

    match Arc::try_unwrap(pool) {
        Ok(mut pool) => pool.shutdown(),
        Err(_) => tracing::warn!(
            component = "daemon",
            "pool handle still shared at shutdown; workers were not joined"
        ),
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        component = "daemon",
        queries_served = snapshot.queries_served,
        files_processed = snapshot.files_processed,
        "shutdown complete"
    );
    Ok(())
}
