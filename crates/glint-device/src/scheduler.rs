//! Worker pool that runs batches off the MMIO path.
//!
//! Trigger writes must return to the guest quickly, so batch replay happens
//! on a handful of host threads. Ordering between batches is not the pool's
//! job: the device chains same-thread submissions through their
//! [`Completion`] handles, and the server serializes same-process batches
//! with the process lock. The pool itself is a plain FIFO.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Pool sizing knobs.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Number of worker threads. Zero is rounded up to one.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

/// Completion latch for one submitted job.
///
/// Cloned handles observe the same job; [`Completion::wait`] blocks until a
/// worker has finished running it.
#[derive(Clone)]
pub struct Completion {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Completion {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub fn wait(&self) {
        let (done, cvar) = &*self.inner;
        let mut done = done.lock().unwrap();
        while !*done {
            done = cvar.wait(done).unwrap();
        }
    }

    pub fn is_done(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    fn signal(&self) {
        let (done, cvar) = &*self.inner;
        *done.lock().unwrap() = true;
        cvar.notify_all();
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    jobs: VecDeque<(Job, Completion)>,
    active: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    idle: Condvar,
}

/// Fixed-size worker pool with FIFO job pickup.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    pub fn new(config: SchedulerConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                active: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
        });
        let workers = (0..config.workers.max(1))
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        Self { shared, workers }
    }

    /// Queues `job` and returns its completion latch.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Completion {
        let completion = Completion::new();
        let mut state = self.shared.state.lock().unwrap();
        state.jobs.push_back((Box::new(job), completion.clone()));
        drop(state);
        self.shared.available.notify_one();
        completion
    }

    /// Blocks until no job is queued or running.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.active > 0 || !state.jobs.is_empty() {
            state = self.shared.idle.wait(state).unwrap();
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
        }
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let (job, completion) = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(item) = state.jobs.pop_front() {
                    state.active += 1;
                    break item;
                }
                if state.shutdown {
                    return;
                }
                state = shared.available.wait(state).unwrap();
            }
        };
        job();
        completion.signal();
        let mut state = shared.state.lock().unwrap();
        state.active -= 1;
        if state.active == 0 && state.jobs.is_empty() {
            shared.idle.notify_all();
        }
    }
}
