//! Per guest process state and batch replay.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use glint_egl::EglBackend;
use glint_mem::SharedGuestMemory;
use glint_protocol::{ApiId, BatchStatus};
use tracing::{debug, error, trace, warn};

use crate::api::{ApiProcess, CallCtx, DispatchError};
use crate::apis::{EglApiProcess, GlesApiProcess};
use crate::object_map::ObjectMap;
use crate::stats::BatchStats;
use crate::transport::{Transport, TransportError};

/// How one submitted batch ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every call replayed and the ok status is published. The fence
    /// sequence is ready to be exposed through the trigger register.
    Completed { fence_seq: u32, calls: u32 },
    /// A guest memory fault interrupted the batch; the retry status is
    /// published and the guest will resubmit.
    Retry,
    /// The batch was malformed and dropped. The ok status is still
    /// published so a waiting guest does not spin forever.
    Abandoned,
}

/// Everything the host keeps for one guest process: an API dispatcher per
/// wire API, the set of attached threads, and the shared object registry.
pub struct ProcessState {
    pid: u32,
    backend: Arc<dyn EglBackend>,
    egl: EglApiProcess,
    gles: GlesApiProcess,
    threads: HashSet<u32>,
    object_map: Arc<Mutex<ObjectMap>>,
    stats: BatchStats,
}

impl ProcessState {
    pub fn new(pid: u32, backend: Arc<dyn EglBackend>) -> Self {
        let object_map = Arc::new(Mutex::new(ObjectMap::new()));
        Self {
            pid,
            egl: EglApiProcess::new(backend.clone(), object_map.clone()),
            gles: GlesApiProcess::new(backend.clone(), object_map.clone()),
            backend,
            threads: HashSet::new(),
            object_map,
            stats: BatchStats::new(pid),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn egl(&self) -> &EglApiProcess {
        &self.egl
    }

    pub fn gles(&self) -> &GlesApiProcess {
        &self.gles
    }

    pub fn object_map(&self) -> &Arc<Mutex<ObjectMap>> {
        &self.object_map
    }

    pub fn has_threads(&self) -> bool {
        !self.threads.is_empty()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Attaches `tid`. False when the tid is already attached, which the
    /// server treats as a protocol violation.
    pub fn add_thread(&mut self, tid: u32) -> bool {
        if !self.threads.insert(tid) {
            return false;
        }
        for api in self.apis_mut() {
            api.thread_init(tid);
        }
        debug!(pid = self.pid, tid, "guest thread attached");
        true
    }

    pub fn remove_thread(&mut self, tid: u32) {
        if self.threads.remove(&tid) {
            for api in self.apis_mut() {
                api.thread_fini(tid);
            }
            debug!(pid = self.pid, tid, "guest thread detached");
        } else {
            warn!(pid = self.pid, tid, "detach for unknown thread");
        }
    }

    /// Replays one batch from `tid`'s call buffer.
    pub fn run_batch(
        &mut self,
        mem: &SharedGuestMemory,
        transport: &mut Transport,
        tid: u32,
    ) -> BatchOutcome {
        let header = match transport.begin(mem) {
            Ok(Some(header)) => header,
            Ok(None) => return BatchOutcome::Retry,
            Err(err) => {
                error!(pid = self.pid, tid, error = %err, "malformed batch, dropping");
                if let Err(err) = transport.write_status(mem, BatchStatus::Ok) {
                    error!(pid = self.pid, tid, error = %err, "batch status write failed");
                }
                return BatchOutcome::Abandoned;
            }
        };
        trace!(
            pid = self.pid,
            tid,
            fence = header.fence_seq,
            size = header.batch_size,
            "batch start"
        );
        for api in self.apis_mut() {
            api.batch_start(tid);
        }

        let mut calls = 0u32;
        let mut fault = false;
        loop {
            let call = match transport.begin_call() {
                Ok(Some(call)) => call,
                Ok(None) => break,
                Err(err) => {
                    error!(pid = self.pid, tid, error = %err, "call stream corrupt, dropping rest of batch");
                    break;
                }
            };
            let Some(api_id) = ApiId::from_u32(call.api_id) else {
                error!(
                    pid = self.pid,
                    tid,
                    api = call.api_id,
                    "unknown api id, dropping rest of batch"
                );
                break;
            };
            trace!(pid = self.pid, tid, api = ?api_id, func = call.func_id, "call");
            let mut cctx = CallCtx {
                mem,
                transport: &mut *transport,
                tid,
            };
            match self.api_mut(api_id).dispatch(call.func_id, &mut cctx) {
                Ok(()) => calls += 1,
                Err(DispatchError::Transport(TransportError::Memory(err))) => {
                    debug!(pid = self.pid, tid, error = %err, "guest memory fault, batch will retry");
                    fault = true;
                    break;
                }
                Err(err) => {
                    error!(
                        pid = self.pid,
                        tid,
                        api = ?api_id,
                        func = call.func_id,
                        error = %err,
                        "dropping rest of batch"
                    );
                    break;
                }
            }
        }

        let outcome = if fault {
            if let Err(err) = transport.write_status(mem, BatchStatus::Retry) {
                error!(pid = self.pid, tid, error = %err, "batch status write failed");
            }
            BatchOutcome::Retry
        } else {
            match transport.end(mem) {
                Ok(BatchStatus::Ok) => BatchOutcome::Completed {
                    fence_seq: header.fence_seq,
                    calls,
                },
                Ok(BatchStatus::Retry) => BatchOutcome::Retry,
                Err(err) => {
                    error!(pid = self.pid, tid, error = %err, "batch completion failed");
                    BatchOutcome::Abandoned
                }
            }
        };

        for api in self.apis_mut() {
            api.batch_end(tid);
        }
        if let BatchOutcome::Completed { calls, .. } = outcome {
            self.stats.batch(calls, header.batch_size);
        }
        trace!(pid = self.pid, tid, ?outcome, "batch end");
        outcome
    }

    /// Tears everything down: remaining threads, registered objects,
    /// statistics. The state is unusable afterwards.
    pub(crate) fn shutdown(&mut self) {
        let tids: Vec<u32> = self.threads.drain().collect();
        for tid in tids {
            for api in self.apis_mut() {
                api.thread_fini(tid);
            }
        }
        // Registered objects may hold native resources; give their drops a
        // current context to run under.
        self.backend.ensure_current();
        self.object_map.lock().unwrap().remove_all();
        self.backend.unensure_current();
        self.stats.finish();
    }

    fn api_mut(&mut self, id: ApiId) -> &mut dyn ApiProcess {
        match id {
            ApiId::Egl => &mut self.egl,
            ApiId::Gles => &mut self.gles,
        }
    }

    fn apis_mut(&mut self) -> [&mut dyn ApiProcess; 2] {
        let Self { egl, gles, .. } = self;
        [egl, gles]
    }
}
