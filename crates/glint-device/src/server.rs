//! Guest pid/tid registry and batch routing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glint_egl::EglBackend;
use glint_mem::SharedGuestMemory;
use glint_protocol::GLINT_PROTOCOL_VERSION;
use tracing::{error, info, warn};

use crate::process::{BatchOutcome, ProcessState};
use crate::transport::Transport;

/// Host-side rendering server.
///
/// One per device. Guest processes materialize on the first attach of any
/// of their threads and disappear when the last one detaches. Batches from
/// threads of the same process serialize on the process lock; distinct
/// processes replay concurrently on the worker pool.
pub struct GlintServer {
    backend: Arc<dyn EglBackend>,
    processes: Mutex<HashMap<u32, Arc<Mutex<ProcessState>>>>,
}

impl GlintServer {
    pub fn new(backend: Arc<dyn EglBackend>) -> Self {
        Self {
            backend,
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Handles a thread attach. Returns whether the attach is accepted.
    pub fn dispatch_init(&self, version: u32, pid: u32, tid: u32) -> bool {
        if version != GLINT_PROTOCOL_VERSION {
            error!(
                guest = version,
                host = GLINT_PROTOCOL_VERSION,
                "protocol version mismatch, rejecting attach"
            );
            return false;
        }
        let mut processes = self.processes.lock().unwrap();
        let state = processes.entry(pid).or_insert_with(|| {
            info!(pid, "new guest process");
            Arc::new(Mutex::new(ProcessState::new(pid, self.backend.clone())))
        });
        let added = state.lock().unwrap().add_thread(tid);
        if !added {
            error!(pid, tid, "thread already attached, rejecting attach");
        }
        added
    }

    /// Replays one batch for an attached thread.
    pub fn run_batch(
        &self,
        pid: u32,
        tid: u32,
        mem: &SharedGuestMemory,
        transport: &mut Transport,
    ) -> BatchOutcome {
        let state = self.processes.lock().unwrap().get(&pid).cloned();
        let Some(state) = state else {
            error!(pid, tid, "batch from unknown process");
            return BatchOutcome::Abandoned;
        };
        let mut state = state.lock().unwrap();
        state.run_batch(mem, transport, tid)
    }

    /// Handles a thread detach. The process is destroyed with its last
    /// thread.
    pub fn dispatch_exit(&self, pid: u32, tid: u32) {
        let mut processes = self.processes.lock().unwrap();
        let Some(state) = processes.get(&pid).cloned() else {
            warn!(pid, tid, "detach from unknown process");
            return;
        };
        let mut state = state.lock().unwrap();
        state.remove_thread(tid);
        if !state.has_threads() {
            processes.remove(&pid);
            state.shutdown();
            info!(pid, "guest process gone");
        }
    }

    /// Destroys every process. Device reset.
    pub fn reset(&self) {
        let drained: Vec<_> = self.processes.lock().unwrap().drain().collect();
        for (pid, state) in drained {
            state.lock().unwrap().shutdown();
            info!(pid, "guest process gone");
        }
    }

    pub fn process_count(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    /// Runs `f` against a process's state. Test and inspection hook.
    pub fn with_process<R>(&self, pid: u32, f: impl FnOnce(&ProcessState) -> R) -> Option<R> {
        let state = self.processes.lock().unwrap().get(&pid).cloned();
        state.map(|s| f(&s.lock().unwrap()))
    }
}
