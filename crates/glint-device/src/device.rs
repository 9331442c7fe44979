//! MMIO register window: attach, detach, submit, fence.
//!
//! The guest sees [`MMIO_SIZE_BYTES`] of registers, one
//! [`USER_REGS_SIZE`]-byte pair per guest thread. Writing a call buffer's
//! physical address to `BUFFPTR` runs the attach handshake against the page
//! at that address and answers in place; writing zero detaches. A `TRIGGER`
//! write submits the batch currently in the buffer, synchronously when
//! [`TRIGGER_SYNC`] is set, and a `TRIGGER` read returns the fence sequence
//! of the last completed batch so the guest can poll asynchronous
//! submissions without trapping into the handshake again.
//!
//! Submission order per slot is preserved by chaining each batch job on the
//! previous one's completion before it runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use glint_egl::EglBackend;
use glint_mem::{LockedRegion, SharedGuestMemory};
use glint_protocol::regs::{
    ATTACH_ACCEPT, ATTACH_PID_OFFSET, ATTACH_REJECT, ATTACH_TID_OFFSET, ATTACH_VERSION_OFFSET,
    CALL_BUFFER_SIZE_BYTES, MAX_USERS, MMIO_SIZE_BYTES, REG_BUFFPTR, REG_TRIGGER, TRIGGER_SYNC,
    USER_REGS_SIZE,
};
use tracing::{error, info, warn};

use crate::process::BatchOutcome;
use crate::scheduler::{Completion, SchedulerConfig, WorkQueue};
use crate::server::GlintServer;
use crate::transport::Transport;

struct ActiveUser {
    pid: u32,
    tid: u32,
    buffer_gpa: u64,
    transport: Arc<Mutex<Transport>>,
    fence: Arc<AtomicU32>,
    last: Option<Completion>,
}

#[derive(Default)]
struct UserSlot {
    active: Option<ActiveUser>,
}

/// The glint device: register window in front, server and worker pool
/// behind.
pub struct GlintDevice {
    mem: SharedGuestMemory,
    server: Arc<GlintServer>,
    queue: WorkQueue,
    users: Vec<Mutex<UserSlot>>,
}

impl GlintDevice {
    pub fn new(
        mem: SharedGuestMemory,
        backend: Arc<dyn EglBackend>,
        config: SchedulerConfig,
    ) -> Self {
        let users = (0..MAX_USERS).map(|_| Mutex::new(UserSlot::default())).collect();
        Self {
            mem,
            server: Arc::new(GlintServer::new(backend)),
            queue: WorkQueue::new(config),
            users,
        }
    }

    pub fn server(&self) -> &Arc<GlintServer> {
        &self.server
    }

    /// Blocks until every submitted batch has retired.
    pub fn wait_idle(&self) {
        self.queue.wait_idle();
    }

    pub fn mmio_write(&self, offset: u32, value: u32) {
        if offset >= MMIO_SIZE_BYTES {
            warn!(offset, "write outside the register window");
            return;
        }
        let slot = (offset / USER_REGS_SIZE) as usize;
        match offset % USER_REGS_SIZE {
            REG_BUFFPTR => {
                if value != 0 {
                    self.activate(slot, u64::from(value));
                } else {
                    self.deactivate(slot);
                }
            }
            REG_TRIGGER => self.trigger(slot, value),
            _ => warn!(offset, "unaligned register write"),
        }
    }

    pub fn mmio_read(&self, offset: u32) -> u32 {
        if offset >= MMIO_SIZE_BYTES {
            warn!(offset, "read outside the register window");
            return 0;
        }
        let slot = (offset / USER_REGS_SIZE) as usize;
        let user = self.users[slot].lock().unwrap();
        match offset % USER_REGS_SIZE {
            REG_BUFFPTR => user.active.as_ref().map_or(0, |u| u.buffer_gpa as u32),
            REG_TRIGGER => user
                .active
                .as_ref()
                .map_or(0, |u| u.fence.load(Ordering::SeqCst)),
            _ => {
                warn!(offset, "unaligned register read");
                0
            }
        }
    }

    /// Detaches every user and destroys all server state.
    pub fn reset(&self) {
        for slot in &self.users {
            let taken = slot.lock().unwrap().active.take();
            if let Some(user) = taken {
                if let Some(last) = user.last {
                    last.wait();
                }
                self.server.dispatch_exit(user.pid, user.tid);
            }
        }
        self.server.reset();
    }

    fn activate(&self, slot: usize, gpa: u64) {
        let mut user = self.users[slot].lock().unwrap();
        if user.active.is_some() {
            error!(slot, "buffer register already set, ignoring attach");
            return;
        }
        let Some((version, pid, tid)) = self.read_attach_page(gpa) else {
            error!(slot, gpa, "attach page not readable");
            return;
        };
        if pid == 0 || tid == 0 {
            error!(slot, pid, tid, "attach with null ids");
            self.write_attach_reply(gpa, ATTACH_REJECT);
            return;
        }
        let region = {
            let mut mem = self.mem.lock().unwrap();
            LockedRegion::new(&mut *mem, gpa, CALL_BUFFER_SIZE_BYTES)
        };
        let region = match region {
            Ok(region) => region,
            Err(err) => {
                error!(slot, gpa, error = %err, "call buffer not addressable");
                self.write_attach_reply(gpa, ATTACH_REJECT);
                return;
            }
        };
        if !self.server.dispatch_init(version, pid, tid) {
            self.write_attach_reply(gpa, ATTACH_REJECT);
            return;
        }
        if !self.write_attach_reply(gpa, ATTACH_ACCEPT) {
            // The guest cannot see the accept; undo the registration.
            error!(slot, gpa, "attach reply not writable");
            self.server.dispatch_exit(pid, tid);
            return;
        }
        user.active = Some(ActiveUser {
            pid,
            tid,
            buffer_gpa: gpa,
            transport: Arc::new(Mutex::new(Transport::new(region))),
            fence: Arc::new(AtomicU32::new(0)),
            last: None,
        });
        info!(slot, pid, tid, buffer = gpa, "guest thread attached");
    }

    fn deactivate(&self, slot: usize) {
        let taken = self.users[slot].lock().unwrap().active.take();
        let Some(user) = taken else {
            error!(slot, "no buffer registered, ignoring detach");
            return;
        };
        // Let an in-flight batch retire before the thread goes away.
        if let Some(last) = user.last {
            last.wait();
        }
        self.server.dispatch_exit(user.pid, user.tid);
        info!(slot, pid = user.pid, tid = user.tid, "guest thread detached");
    }

    fn trigger(&self, slot: usize, value: u32) {
        let mut user = self.users[slot].lock().unwrap();
        let Some(active) = user.active.as_mut() else {
            error!(slot, "trigger without a registered buffer");
            return;
        };
        let prev = active.last.clone();
        let transport = active.transport.clone();
        let fence = active.fence.clone();
        let server = self.server.clone();
        let mem = self.mem.clone();
        let (pid, tid) = (active.pid, active.tid);
        let completion = self.queue.submit(move || {
            if let Some(prev) = prev {
                prev.wait();
            }
            let mut transport = transport.lock().unwrap();
            let outcome = server.run_batch(pid, tid, &mem, &mut transport);
            if let BatchOutcome::Completed { fence_seq, .. } = outcome {
                fence.store(fence_seq, Ordering::SeqCst);
            }
        });
        active.last = Some(completion.clone());
        drop(user);
        if value & TRIGGER_SYNC != 0 {
            completion.wait();
        }
    }

    fn read_attach_page(&self, gpa: u64) -> Option<(u32, u32, u32)> {
        let mut mem = self.mem.lock().unwrap();
        let m = &mut *mem;
        let version = m.read_u32(gpa + u64::from(ATTACH_VERSION_OFFSET)).ok()?;
        let pid = m.read_u32(gpa + u64::from(ATTACH_PID_OFFSET)).ok()?;
        let tid = m.read_u32(gpa + u64::from(ATTACH_TID_OFFSET)).ok()?;
        Some((version, pid, tid))
    }

    fn write_attach_reply(&self, gpa: u64, reply: u32) -> bool {
        let mut mem = self.mem.lock().unwrap();
        mem.write_u32(gpa + u64::from(ATTACH_VERSION_OFFSET), reply)
            .is_ok()
    }
}
