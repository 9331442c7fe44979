//! Offscreen rendering strategy.
//!
//! Guest surfaces are backed by host pbuffers and never reach a real
//! window. On swap the color buffer is read back, flipped to top-down row
//! order and copied into the guest pixel buffer registered at surface
//! creation time.

use std::sync::Arc;

use tracing::{error, warn};

use glint_mem::{CompiledTransfer, SharedGuestMemory};

use crate::attribs::{EGL_HEIGHT, EGL_WIDTH};
use crate::backend::{
    rebind_worker, release_worker, unbind_worker, BackendContext, BackendDisplay, BackendImage,
    BackendSurface, EglBackend, EnsureCtx, WorkerCtx,
};
use crate::config::ConfigAttribs;
use crate::driver::{CurrentBinding, NativeContext, NativeDisplay, NativeDriver, NativeSurface};
use crate::surface::SurfaceKind;

pub struct OffscreenBackend {
    driver: Arc<dyn NativeDriver>,
    mem: SharedGuestMemory,
    ensure: EnsureCtx,
}

impl OffscreenBackend {
    /// Fails when the driver cannot supply the private root context every
    /// guest context shares with.
    pub fn new(driver: Arc<dyn NativeDriver>, mem: SharedGuestMemory) -> Option<Self> {
        let ensure = EnsureCtx::create(driver.as_ref())?;
        Some(Self {
            driver,
            mem,
            ensure,
        })
    }
}

impl Drop for OffscreenBackend {
    fn drop(&mut self) {
        self.ensure.destroy(self.driver.as_ref());
    }
}

impl EglBackend for OffscreenBackend {
    fn thread_init(&self, _worker: &mut WorkerCtx) {}

    fn batch_start(&self, worker: &mut WorkerCtx) {
        rebind_worker(self.driver.as_ref(), worker);
    }

    fn batch_end(&self, worker: &mut WorkerCtx) {
        unbind_worker(self.driver.as_ref(), worker);
    }

    fn thread_fini(&self, worker: &mut WorkerCtx) {
        assert!(
            worker.current.is_none(),
            "context still bound at thread teardown"
        );
    }

    fn create_display(&self) -> Option<Box<dyn BackendDisplay>> {
        Some(Box::new(OffscreenDisplay {
            driver: self.driver.clone(),
            mem: self.mem.clone(),
            native: self.driver.display_open(),
            global_ctx: self.ensure.global_ctx(),
        }))
    }

    fn make_current(
        &self,
        worker: &mut WorkerCtx,
        dpy: NativeDisplay,
        ctx: NativeContext,
        draw: Option<NativeSurface>,
        read: Option<NativeSurface>,
    ) -> bool {
        if worker.current.is_some() {
            // Flush the outgoing context before switching away.
            self.driver.flush();
        }
        let (Some(draw), Some(read)) = (draw, read) else {
            error!("surfaceless make_current not supported offscreen");
            return false;
        };
        let ok = self
            .driver
            .make_current(dpy, Some(draw), Some(read), Some(ctx));
        if ok {
            worker.current = Some(CurrentBinding {
                dpy,
                draw: Some(draw),
                read: Some(read),
                ctx,
            });
        }
        ok
    }

    fn release_current(&self, worker: &mut WorkerCtx, force: bool) -> bool {
        release_worker(self.driver.as_ref(), worker, force)
    }

    fn flush(&self) {
        self.driver.flush();
    }

    fn ensure_current(&self) {
        self.ensure.ensure(self.driver.as_ref());
    }

    fn unensure_current(&self) {
        self.ensure.unensure(self.driver.as_ref());
    }
}

struct OffscreenDisplay {
    driver: Arc<dyn NativeDriver>,
    mem: SharedGuestMemory,
    native: NativeDisplay,
    global_ctx: NativeContext,
}

impl Drop for OffscreenDisplay {
    fn drop(&mut self) {
        self.driver.display_close(self.native);
    }
}

impl BackendDisplay for OffscreenDisplay {
    fn native(&self) -> NativeDisplay {
        self.native
    }

    fn config_enum(&self) -> Vec<ConfigAttribs> {
        self.driver.config_enum(self.native)
    }

    fn config_cleanup(&self, cfg: &ConfigAttribs) {
        self.driver.config_cleanup(self.native, cfg);
    }

    fn create_context(
        &self,
        cfg: &ConfigAttribs,
        _share: Option<NativeContext>,
    ) -> Option<Box<dyn BackendContext>> {
        // Everything already shares through the global root context.
        let native = self
            .driver
            .context_create(self.native, cfg, Some(self.global_ctx))?;
        Some(Box::new(OffscreenContext {
            driver: self.driver.clone(),
            dpy: self.native,
            native,
        }))
    }

    fn create_offscreen_surface(
        &self,
        cfg: &ConfigAttribs,
        kind: SurfaceKind,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
    ) -> Option<Box<dyn BackendSurface>> {
        let len = width.checked_mul(height).and_then(|v| v.checked_mul(bpp))?;
        let transfer = {
            let mut mem = self.mem.lock().unwrap();
            match CompiledTransfer::new(&mut *mem, pixels_va, len) {
                Ok(transfer) => transfer,
                Err(err) => {
                    warn!(va = pixels_va, len, error = %err, "guest pixel buffer rejected");
                    return None;
                }
            }
        };
        let native = self
            .driver
            .pbuffer_surface_create(self.native, cfg, width, height)?;
        Some(Box::new(OffscreenSurface {
            driver: self.driver.clone(),
            mem: self.mem.clone(),
            dpy: self.native,
            kind,
            native,
            width,
            height,
            bpp,
            staging: Vec::new(),
            transfer,
        }))
    }

    fn create_onscreen_surface(
        &self,
        _cfg: &ConfigAttribs,
        _kind: SurfaceKind,
        _winsys_id: u32,
    ) -> Option<Box<dyn BackendSurface>> {
        error!("winsys surfaces require the onscreen backend");
        None
    }

    fn create_image(&self, _buffer: u32) -> Option<Box<dyn BackendImage>> {
        None
    }
}

struct OffscreenContext {
    driver: Arc<dyn NativeDriver>,
    dpy: NativeDisplay,
    native: NativeContext,
}

impl Drop for OffscreenContext {
    fn drop(&mut self) {
        self.driver.context_destroy(self.dpy, self.native);
    }
}

impl BackendContext for OffscreenContext {
    fn native(&self) -> NativeContext {
        self.native
    }
}

struct OffscreenSurface {
    driver: Arc<dyn NativeDriver>,
    mem: SharedGuestMemory,
    dpy: NativeDisplay,
    kind: SurfaceKind,
    native: NativeSurface,
    width: u32,
    height: u32,
    bpp: u32,
    staging: Vec<u8>,
    transfer: CompiledTransfer,
}

impl OffscreenSurface {
    /// Reads the color buffer back and pushes it to the guest pixel
    /// buffer. Swap and copy are the same operation offscreen.
    fn readback(&mut self) -> bool {
        let len = (self.width * self.height * self.bpp) as usize;
        if self.staging.len() != len {
            // Sized to (width, height, bpp); only reallocated on change.
            self.staging.resize(len, 0);
        }
        if !self
            .driver
            .read_pixels(self.width, self.height, self.bpp, &mut self.staging)
        {
            warn!("pixel readback failed");
            return false;
        }
        flip_rows(&mut self.staging, (self.width * self.bpp) as usize);
        let mut mem = self.mem.lock().unwrap();
        if let Err(err) = self.transfer.exec(&mut *mem, &self.staging) {
            warn!(error = %err, "pixel writeback failed");
            return false;
        }
        true
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        self.driver.pbuffer_surface_destroy(self.dpy, self.native);
    }
}

impl BackendSurface for OffscreenSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn native(&self) -> NativeSurface {
        self.native
    }

    fn query(&self, attribute: i32) -> Option<i32> {
        match attribute {
            EGL_WIDTH => Some(self.width as i32),
            EGL_HEIGHT => Some(self.height as i32),
            _ => None,
        }
    }

    fn swap_buffers(&mut self) -> bool {
        self.readback()
    }

    fn copy_buffers(&mut self) -> bool {
        self.readback()
    }
}

/// Reverses row order in place. GL reads rows bottom-up; guest pixel
/// buffers are top-down.
pub(crate) fn flip_rows(pixels: &mut [u8], line_size: usize) {
    if line_size == 0 {
        return;
    }
    let rows = pixels.len() / line_size;
    let mut top = 0;
    let mut bottom = rows.saturating_sub(1);
    while top < bottom {
        let (head, tail) = pixels.split_at_mut(bottom * line_size);
        head[top * line_size..top * line_size + line_size].swap_with_slice(&mut tail[..line_size]);
        top += 1;
        bottom -= 1;
    }
}
