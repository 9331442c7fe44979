use std::sync::{Arc, Mutex};

use glint_mem::{SharedGuestMemory, VecGuestMemory};

use crate::api::{EglApi, EglThread};
use crate::handle::HostHandle;
use crate::mock::MockDriver;
use crate::offscreen::OffscreenBackend;

mod surface;

fn guest_mem(size: usize) -> SharedGuestMemory {
    Arc::new(Mutex::new(VecGuestMemory::new(size)))
}

/// Offscreen EGL stack over the mock driver, with one guest thread attached.
fn offscreen() -> (Arc<MockDriver>, SharedGuestMemory, EglApi, EglThread) {
    let driver = Arc::new(MockDriver::new());
    let mem = guest_mem(0x10_0000);
    let backend = OffscreenBackend::new(driver.clone(), mem.clone()).unwrap();
    let api = EglApi::new(Arc::new(backend));
    let mut ts = EglThread::new();
    api.thread_init(&mut ts);
    (driver, mem, api, ts)
}

/// [`offscreen`] plus an initialized display for guest display id 0.
fn initialized() -> (
    Arc<MockDriver>,
    SharedGuestMemory,
    EglApi,
    EglThread,
    HostHandle,
) {
    let (driver, mem, api, mut ts) = offscreen();
    let dpy = api.get_display(0);
    assert_ne!(dpy, 0);
    api.initialize(&mut ts, dpy).unwrap();
    (driver, mem, api, ts, dpy)
}
