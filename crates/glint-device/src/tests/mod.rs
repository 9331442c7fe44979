use std::sync::{Arc, Mutex};

use glint_egl::attribs::EGL_NONE;
use glint_egl::{MockDriver, OffscreenBackend};
use glint_mem::{
    FaultingMemory, GuestMemory, LockedRegion, SharedGuestMemory, VecGuestMemory,
};
use glint_protocol::regs::{
    ATTACH_PID_OFFSET, ATTACH_TID_OFFSET, ATTACH_VERSION_OFFSET, CALL_BUFFER_SIZE_BYTES,
};
use glint_protocol::wire::SLOT_BYTES;
use glint_protocol::{ApiId, BatchWriter, EglFunc};

use crate::process::BatchOutcome;
use crate::server::GlintServer;
use crate::transport::Transport;

mod lifecycle;
mod object_map;
mod transport;

/// Guest physical address of the call buffer used throughout the tests.
const BUF: u64 = 0x4000;

fn shared_mem(size: usize) -> SharedGuestMemory {
    Arc::new(Mutex::new(VecGuestMemory::new(size)))
}

/// Shared memory with a poisonable fault range, plus a typed handle to it.
fn faulting_mem(
    size: usize,
) -> (Arc<Mutex<FaultingMemory<VecGuestMemory>>>, SharedGuestMemory) {
    let typed = Arc::new(Mutex::new(FaultingMemory::new(VecGuestMemory::new(size))));
    let mem: SharedGuestMemory = typed.clone();
    (typed, mem)
}

/// Offscreen server over the mock driver.
fn offscreen_server(mem: &SharedGuestMemory) -> (Arc<MockDriver>, GlintServer) {
    let driver = Arc::new(MockDriver::new());
    let backend = OffscreenBackend::new(driver.clone(), mem.clone()).unwrap();
    (driver, GlintServer::new(Arc::new(backend)))
}

/// Places `image` at [`BUF`] and builds a transport over the buffer.
fn load_image(mem: &SharedGuestMemory, image: &[u8]) -> Transport {
    let mut m = mem.lock().unwrap();
    m.write(BUF, image).unwrap();
    let region = LockedRegion::new(&mut *m, BUF, CALL_BUFFER_SIZE_BYTES).unwrap();
    Transport::new(region)
}

/// Overwrites the buffer with a fresh image, reusing `t`'s region. The
/// resubmit path after a retry.
fn reload_image(mem: &SharedGuestMemory, image: &[u8]) {
    mem.lock().unwrap().write(BUF, image).unwrap();
}

fn read_u32_at(mem: &SharedGuestMemory, gpa: u64) -> u32 {
    mem.lock().unwrap().read_u32(gpa).unwrap()
}

fn read_bytes_at(mem: &SharedGuestMemory, gpa: u64, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    mem.lock().unwrap().read(gpa, &mut bytes).unwrap();
    bytes
}

fn write_bytes_at(mem: &SharedGuestMemory, gpa: u64, bytes: &[u8]) {
    mem.lock().unwrap().write(gpa, bytes).unwrap();
}

/// Batch-image offset of the value slot the next `put_in_arg` reserves.
fn next_value_slot(w: &BatchWriter) -> u32 {
    w.as_bytes().len() as u32 + SLOT_BYTES
}

/// Batch-image offset of the count slot the next in-array reserves.
fn next_count_slot(w: &BatchWriter) -> u32 {
    w.as_bytes().len() as u32 + SLOT_BYTES
}

/// Batch-image offset of the inline payload the next non-direct in-array
/// reserves.
fn next_payload_off(w: &BatchWriter) -> u32 {
    w.as_bytes().len() as u32 + 2 * SLOT_BYTES
}

fn le_words(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    bytes
}

/// Fills the attach page the guest hands over with its buffer address.
fn write_attach_page(mem: &SharedGuestMemory, gpa: u64, version: u32, pid: u32, tid: u32) {
    let mut m = mem.lock().unwrap();
    m.write_u32(gpa + u64::from(ATTACH_VERSION_OFFSET), version)
        .unwrap();
    m.write_u32(gpa + u64::from(ATTACH_PID_OFFSET), pid).unwrap();
    m.write_u32(gpa + u64::from(ATTACH_TID_OFFSET), tid).unwrap();
}

/// GetDisplay then Initialize over the wire, fences 1 and 2. Returns the
/// display handle; callers continue from fence 3.
fn egl_bootstrap(
    server: &GlintServer,
    mem: &SharedGuestMemory,
    t: &mut Transport,
    pid: u32,
    tid: u32,
) -> u32 {
    let mut w = BatchWriter::new();
    w.set_fence_seq(1);
    w.begin_call(ApiId::Egl, EglFunc::GetDisplay as u32, false);
    w.put_u32(0);
    let dpy_slot = next_value_slot(&w);
    w.put_in_arg(0x100);
    reload_image(mem, &w.finish());
    let outcome = server.run_batch(pid, tid, mem, t);
    assert_eq!(outcome, BatchOutcome::Completed { fence_seq: 1, calls: 1 });
    let dpy = read_u32_at(mem, BUF + u64::from(dpy_slot));
    assert_ne!(dpy, 0);

    let mut w = BatchWriter::new();
    w.set_fence_seq(2);
    w.begin_call(ApiId::Egl, EglFunc::Initialize as u32, false);
    w.put_u32(dpy);
    w.put_in_arg(0);
    w.put_in_arg(0);
    w.put_in_arg(0);
    let ok_slot = next_value_slot(&w);
    w.put_in_arg(0x10C);
    reload_image(mem, &w.finish());
    let outcome = server.run_batch(pid, tid, mem, t);
    assert_eq!(outcome, BatchOutcome::Completed { fence_seq: 2, calls: 1 });
    assert_eq!(read_u32_at(mem, BUF + u64::from(ok_slot)), 1);
    dpy
}

/// ChooseConfig over the wire, fence 3. Returns the best matching config.
fn egl_first_config(
    server: &GlintServer,
    mem: &SharedGuestMemory,
    t: &mut Transport,
    pid: u32,
    tid: u32,
    dpy: u32,
) -> u32 {
    let mut w = BatchWriter::new();
    w.set_fence_seq(3);
    w.begin_call(ApiId::Egl, EglFunc::ChooseConfig as u32, false);
    w.put_u32(dpy);
    w.put_out_array(0x200, 1, &EGL_NONE.to_le_bytes());
    let count_slot = next_count_slot(&w);
    let payload_off = next_payload_off(&w);
    w.put_in_array(0x300, 1, 4);
    w.put_in_arg(0);
    let ok_slot = next_value_slot(&w);
    w.put_in_arg(0x20C);
    reload_image(mem, &w.finish());
    let outcome = server.run_batch(pid, tid, mem, t);
    assert_eq!(outcome, BatchOutcome::Completed { fence_seq: 3, calls: 1 });
    assert_eq!(read_u32_at(mem, BUF + u64::from(count_slot)), 1);
    assert_eq!(read_u32_at(mem, BUF + u64::from(ok_slot)), 1);
    let cfg = read_u32_at(mem, BUF + u64::from(payload_off));
    assert_ne!(cfg, 0);
    cfg
}
