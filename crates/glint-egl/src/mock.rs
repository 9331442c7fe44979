//! In-memory [`NativeDriver`] used by tests and the default server setup.
//!
//! Deterministic by construction: readback contents are a fixed function of
//! the current draw surface id, so a test can predict guest pixel data
//! byte-for-byte. Failure injection flips make a single upcoming driver
//! call fail, which is how backend error paths get exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::config::ConfigAttribs;
use crate::driver::{CurrentBinding, NativeContext, NativeDisplay, NativeDriver, NativeSurface};
use crate::onscreen::{WinsysInterface, WinsysSurface};

/// Byte `i` of a readback from the surface with native id `seed`.
pub fn pattern_byte(seed: u64, i: usize) -> u8 {
    ((seed.wrapping_add(i as u64)) % 251) as u8
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    displays: Vec<u64>,
    surfaces: HashMap<u64, (u32, u32)>,
    contexts: Vec<u64>,
    current: HashMap<ThreadId, CurrentBinding>,
}

impl MockState {
    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct MockDriver {
    state: Mutex<MockState>,
    configs: Vec<ConfigAttribs>,
    fail_pbuffer_create: AtomicBool,
    fail_context_create: AtomicBool,
    fail_make_current: AtomicBool,
    flushes: AtomicU32,
}

impl MockDriver {
    pub fn new() -> Self {
        // One multisampled and one zero-depth format alongside the plain
        // RGBA8888 so initialization filtering and ordering are observable.
        let mut rgb565 = ConfigAttribs::rgba8888(3, 16, 8, 0);
        rgb565.red_size = 5;
        rgb565.green_size = 6;
        rgb565.blue_size = 5;
        rgb565.alpha_size = 0;
        rgb565.buffer_size = 16;

        Self {
            state: Mutex::new(MockState::default()),
            configs: vec![
                ConfigAttribs::rgba8888(1, 24, 8, 0),
                ConfigAttribs::rgba8888(2, 24, 8, 4),
                rgb565,
                ConfigAttribs::rgba8888(4, 0, 0, 0),
            ],
            fail_pbuffer_create: AtomicBool::new(false),
            fail_context_create: AtomicBool::new(false),
            fail_make_current: AtomicBool::new(false),
            flushes: AtomicU32::new(0),
        }
    }

    /// Replaces the built-in config table.
    pub fn with_configs(configs: Vec<ConfigAttribs>) -> Self {
        Self { configs, ..Self::new() }
    }

    pub fn fail_next_pbuffer_create(&self) {
        self.fail_pbuffer_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_context_create(&self) {
        self.fail_context_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_make_current(&self) {
        self.fail_make_current.store(true, Ordering::SeqCst);
    }

    pub fn flush_count(&self) -> u32 {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.lock().unwrap().surfaces.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.state.lock().unwrap().contexts.len()
    }

    fn take(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeDriver for MockDriver {
    fn display_open(&self) -> NativeDisplay {
        let mut s = self.state.lock().unwrap();
        let id = s.mint();
        s.displays.push(id);
        NativeDisplay(id)
    }

    fn display_close(&self, dpy: NativeDisplay) {
        let mut s = self.state.lock().unwrap();
        s.displays.retain(|&d| d != dpy.0);
    }

    fn config_enum(&self, _dpy: NativeDisplay) -> Vec<ConfigAttribs> {
        self.configs.clone()
    }

    fn pbuffer_surface_create(
        &self,
        _dpy: NativeDisplay,
        _cfg: &ConfigAttribs,
        width: u32,
        height: u32,
    ) -> Option<NativeSurface> {
        if Self::take(&self.fail_pbuffer_create) {
            return None;
        }
        let mut s = self.state.lock().unwrap();
        let id = s.mint();
        s.surfaces.insert(id, (width, height));
        Some(NativeSurface(id))
    }

    fn pbuffer_surface_destroy(&self, _dpy: NativeDisplay, sfc: NativeSurface) {
        self.state.lock().unwrap().surfaces.remove(&sfc.0);
    }

    fn context_create(
        &self,
        _dpy: NativeDisplay,
        _cfg: &ConfigAttribs,
        _share: Option<NativeContext>,
    ) -> Option<NativeContext> {
        if Self::take(&self.fail_context_create) {
            return None;
        }
        let mut s = self.state.lock().unwrap();
        let id = s.mint();
        s.contexts.push(id);
        Some(NativeContext(id))
    }

    fn context_destroy(&self, _dpy: NativeDisplay, ctx: NativeContext) {
        self.state.lock().unwrap().contexts.retain(|&c| c != ctx.0);
    }

    fn make_current(
        &self,
        dpy: NativeDisplay,
        draw: Option<NativeSurface>,
        read: Option<NativeSurface>,
        ctx: Option<NativeContext>,
    ) -> bool {
        if Self::take(&self.fail_make_current) {
            return false;
        }
        let mut s = self.state.lock().unwrap();
        let tid = thread::current().id();
        match ctx {
            Some(ctx) => {
                s.current.insert(tid, CurrentBinding { dpy, draw, read, ctx });
            }
            None => {
                s.current.remove(&tid);
            }
        }
        true
    }

    fn current(&self) -> Option<CurrentBinding> {
        self.state.lock().unwrap().current.get(&thread::current().id()).copied()
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn read_pixels(&self, width: u32, height: u32, bpp: u32, dst: &mut [u8]) -> bool {
        let Some(binding) = self.current() else {
            return false;
        };
        let Some(draw) = binding.draw else {
            return false;
        };
        let len = (width * height * bpp) as usize;
        if dst.len() < len {
            return false;
        }
        for (i, b) in dst[..len].iter_mut().enumerate() {
            *b = pattern_byte(draw.0, i);
        }
        true
    }
}

/// In-memory [`WinsysInterface`]. Buffers are registered up front with
/// fixed dimensions; presentation just counts dirty marks.
#[derive(Default)]
pub struct MockWinsys {
    surfaces: Mutex<HashMap<u32, Arc<MockWinsysSurface>>>,
}

impl MockWinsys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: u32, width: u32, height: u32) {
        let sfc = Arc::new(MockWinsysSurface {
            id,
            width,
            height,
            dirty_marks: AtomicU32::new(0),
        });
        self.surfaces.lock().unwrap().insert(id, sfc);
    }

    pub fn unregister(&self, id: u32) {
        self.surfaces.lock().unwrap().remove(&id);
    }

    /// Times the buffer was marked dirty, i.e. frames presented to it.
    pub fn dirty_marks(&self, id: u32) -> u32 {
        self.surfaces
            .lock()
            .unwrap()
            .get(&id)
            .map(|s| s.dirty_marks.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl WinsysInterface for MockWinsys {
    fn acquire_surface(&self, id: u32) -> Option<Arc<dyn WinsysSurface>> {
        let sfc = self.surfaces.lock().unwrap().get(&id).cloned()?;
        Some(sfc)
    }
}

pub struct MockWinsysSurface {
    id: u32,
    width: u32,
    height: u32,
    dirty_marks: AtomicU32,
}

impl WinsysSurface for MockWinsysSurface {
    fn id(&self) -> u32 {
        self.id
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_dirty(&self) {
        self.dirty_marks.fetch_add(1, Ordering::SeqCst);
    }
}
