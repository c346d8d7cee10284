// src/core/threadpool.rs

//! A fixed-size worker pool draining a FIFO job queue.
//!
//! Deliberately **not** async: the rest of this crate's ambient stack
//! follows the teacher's tokio idiom, but the watcher->worker pipeline is
//! specified as blocking OS threads guarded by a single mutex and two
//! condition variables, matching the original C `workerpool.c`
//! (`pthread_mutex_t` + two `pthread_cond_t`s). See the design notes on
//! concurrency primitives.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::core::errors::{AntError, AntResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    jobs: VecDeque<Job>,
    working: usize,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<State>,
    /// Signaled on every successful `submit` and on `shutdown`.
    work_available: Condvar,
    /// Signaled whenever the queue empties and no worker is executing.
    work_done: Condvar,
}

/// A bounded pool of worker threads. `submit` never blocks; workers block
/// on `work_available` when the queue is empty.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `n` worker threads (minimum 2).
    pub fn create(n: usize) -> AntResult<Self> {
        if n < 2 {
            return Err(AntError::ConfigInvalid(format!(
                "thread pool requires at least 2 workers, got {n}"
            )));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                jobs: VecDeque::new(),
                working: 0,
                shutting_down: false,
            }),
            work_available: Condvar::new(),
            work_done: Condvar::new(),
        });

        let workers = (0..n)
            .map(|id| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("bigsid-worker-{id}"))
                    .spawn(move || Self::worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Ok(Self { shared, workers })
    }

    fn worker_loop(shared: Arc<Shared>) {
        loop {
            let job = {
                let mut state = shared.state.lock().unwrap();
                loop {
                    if let Some(job) = state.jobs.pop_front() {
                        state.working += 1;
                        break Some(job);
                    }
                    if state.shutting_down {
                        break None;
                    }
                    state = shared.work_available.wait(state).unwrap();
                }
            };

            let Some(job) = job else {
                return;
            };

            job();

            let mut state = shared.state.lock().unwrap();
            state.working -= 1;
            if state.jobs.is_empty() && state.working == 0 {
                shared.work_done.notify_all();
            }
        }
    }

    /// Enqueues `job`. Rejects with `AccessDenied` if `shutdown` has already
    /// been requested; otherwise the job is processed exactly once.
    pub fn submit<F>(&self, job: F) -> AntResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        if state.shutting_down {
            return Err(AntError::AccessDenied(
                "thread pool is shutting down".into(),
            ));
        }
        state.jobs.push_back(Box::new(job));
        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Blocks until the queue is empty and no worker is mid-job.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while !(state.jobs.is_empty() && state.working == 0) {
            state = self.shared.work_done.wait(state).unwrap();
        }
    }

    /// Refuses new submissions, lets in-flight and already-queued jobs
    /// finish, then joins every worker.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutting_down = true;
            self.shared.work_available.notify_all();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rejects_too_few_workers() {
        assert!(ThreadPool::create(1).is_err());
        assert!(ThreadPool::create(2).is_ok());
    }

    /// S4: worker-pool torture test.
    #[test]
    fn s4_ten_thousand_jobs_complete_exactly_once() {
        let mut pool = ThreadPool::create(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10_000 {
            let counter = counter.clone();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 10_000);
        pool.shutdown();
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let mut pool = ThreadPool::create(2).unwrap();
        pool.shutdown();
        assert!(matches!(
            pool.submit(|| {}),
            Err(AntError::AccessDenied(_))
        ));
    }
}
