//! Rendering backend boundary.
//!
//! The EGL model calls through these traits and never touches the native
//! driver directly. Two implementations exist: [`crate::offscreen`] renders
//! into pbuffers and copies pixels back to guest memory, [`crate::onscreen`]
//! renders into winsys buffers the emulator UI composites.
//!
//! A guest thread's batches may run on different worker OS threads, so the
//! native binding lives in a [`WorkerCtx`] owned by the guest thread state
//! and is re-established on whatever OS thread picks the batch up.

use crate::config::ConfigAttribs;
use crate::driver::{CurrentBinding, NativeContext, NativeDisplay, NativeDriver, NativeSurface};
use crate::surface::SurfaceKind;

/// Per guest thread backend state. [`EglBackend::batch_start`] binds the
/// recorded context on the current OS thread, [`EglBackend::batch_end`]
/// unbinds it again so the worker is clean for the next guest thread.
#[derive(Debug, Default)]
pub struct WorkerCtx {
    pub(crate) current: Option<CurrentBinding>,
}

impl WorkerCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self) -> Option<CurrentBinding> {
        self.current
    }
}

pub trait EglBackend: Send + Sync {
    fn thread_init(&self, worker: &mut WorkerCtx);

    /// Re-establishes `worker`'s binding on the calling OS thread.
    fn batch_start(&self, worker: &mut WorkerCtx);

    /// Releases the calling OS thread's binding without forgetting it.
    fn batch_end(&self, worker: &mut WorkerCtx);

    /// Thread teardown hook. The caller must have released any current
    /// context first; a binding still recorded here is a bookkeeping bug.
    fn thread_fini(&self, worker: &mut WorkerCtx);

    fn create_display(&self) -> Option<Box<dyn BackendDisplay>>;

    fn make_current(
        &self,
        worker: &mut WorkerCtx,
        dpy: NativeDisplay,
        ctx: NativeContext,
        draw: Option<NativeSurface>,
        read: Option<NativeSurface>,
    ) -> bool;

    /// Unbinds the current context. With `force` the binding is dropped
    /// even when the driver refuses, which is how thread teardown avoids
    /// leaking a wedged context.
    fn release_current(&self, worker: &mut WorkerCtx, force: bool) -> bool;

    /// Flushes queued native rendering on the calling OS thread.
    fn flush(&self);

    /// Makes a private context current if the calling OS thread has none.
    /// Native object destruction outside a batch needs one.
    fn ensure_current(&self);

    /// Undoes [`EglBackend::ensure_current`]. A guest binding established
    /// by `batch_start` is left untouched.
    fn unensure_current(&self);
}

pub trait BackendDisplay: Send + Sync {
    fn native(&self) -> NativeDisplay;

    fn config_enum(&self) -> Vec<ConfigAttribs>;

    fn config_cleanup(&self, cfg: &ConfigAttribs) {
        let _ = cfg;
    }

    fn create_context(
        &self,
        cfg: &ConfigAttribs,
        share: Option<NativeContext>,
    ) -> Option<Box<dyn BackendContext>>;

    /// Creates a surface whose color buffer is copied back to the guest
    /// pixel buffer at `pixels_va` on swap. Offscreen rendering only.
    fn create_offscreen_surface(
        &self,
        cfg: &ConfigAttribs,
        kind: SurfaceKind,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
    ) -> Option<Box<dyn BackendSurface>>;

    /// Creates a surface backed by the winsys buffer `winsys_id`. Onscreen
    /// rendering only.
    fn create_onscreen_surface(
        &self,
        cfg: &ConfigAttribs,
        kind: SurfaceKind,
        winsys_id: u32,
    ) -> Option<Box<dyn BackendSurface>>;

    /// Wraps the winsys buffer `buffer` for sharing between contexts.
    /// Onscreen rendering only.
    fn create_image(&self, buffer: u32) -> Option<Box<dyn BackendImage>>;
}

pub trait BackendSurface: Send {
    fn kind(&self) -> SurfaceKind;

    fn native(&self) -> NativeSurface;

    /// `EGL_WIDTH`/`EGL_HEIGHT`; `None` for attributes the backend does
    /// not track.
    fn query(&self, attribute: i32) -> Option<i32>;

    fn swap_buffers(&mut self) -> bool;

    fn copy_buffers(&mut self) -> bool;

    fn wait_gl(&mut self) {}

    /// Rebinds the surface to a new winsys buffer after the UI resized or
    /// recreated it.
    fn invalidate(&mut self, winsys_id: u32) {
        let _ = winsys_id;
    }
}

pub trait BackendContext: Send + Sync {
    fn native(&self) -> NativeContext;
}

/// Backend half of an EGLImage. Dropping it releases the native object.
pub trait BackendImage: Send + Sync {}

/// Private display/surface/context triple created at backend startup.
///
/// Serves two jobs. Its root context is the share ancestor of every guest
/// context, so winsys buffers are visible across all of them. And it is
/// what [`EglBackend::ensure_current`] binds when native cleanup runs on a
/// thread with no guest binding.
pub(crate) struct EnsureCtx {
    dpy: NativeDisplay,
    config: ConfigAttribs,
    sfc: NativeSurface,
    ctx: NativeContext,
    global_ctx: NativeContext,
}

impl EnsureCtx {
    pub(crate) fn create(driver: &dyn NativeDriver) -> Option<Self> {
        let dpy = driver.display_open();
        let Some(config) = driver.config_enum(dpy).into_iter().next() else {
            driver.display_close(dpy);
            return None;
        };
        let Some(sfc) = driver.pbuffer_surface_create(dpy, &config, 1, 1) else {
            driver.config_cleanup(dpy, &config);
            driver.display_close(dpy);
            return None;
        };
        let Some(ctx) = driver.context_create(dpy, &config, None) else {
            driver.pbuffer_surface_destroy(dpy, sfc);
            driver.config_cleanup(dpy, &config);
            driver.display_close(dpy);
            return None;
        };
        let Some(global_ctx) = driver.context_create(dpy, &config, Some(ctx)) else {
            driver.context_destroy(dpy, ctx);
            driver.pbuffer_surface_destroy(dpy, sfc);
            driver.config_cleanup(dpy, &config);
            driver.display_close(dpy);
            return None;
        };
        Some(Self {
            dpy,
            config,
            sfc,
            ctx,
            global_ctx,
        })
    }

    /// Share ancestor for guest contexts.
    pub(crate) fn global_ctx(&self) -> NativeContext {
        self.global_ctx
    }

    pub(crate) fn display(&self) -> NativeDisplay {
        self.dpy
    }

    pub(crate) fn config(&self) -> &ConfigAttribs {
        &self.config
    }

    pub(crate) fn ensure(&self, driver: &dyn NativeDriver) {
        if driver.current().is_some() {
            return;
        }
        driver.make_current(self.dpy, Some(self.sfc), Some(self.sfc), Some(self.ctx));
    }

    pub(crate) fn unensure(&self, driver: &dyn NativeDriver) {
        match driver.current() {
            Some(binding) if binding.ctx == self.ctx => {
                driver.make_current(self.dpy, None, None, None);
            }
            _ => {}
        }
    }

    pub(crate) fn destroy(&self, driver: &dyn NativeDriver) {
        driver.context_destroy(self.dpy, self.global_ctx);
        driver.context_destroy(self.dpy, self.ctx);
        driver.pbuffer_surface_destroy(self.dpy, self.sfc);
        driver.config_cleanup(self.dpy, &self.config);
        driver.display_close(self.dpy);
    }
}

/// Re-establishes `worker`'s recorded binding on the calling OS thread.
pub(crate) fn rebind_worker(driver: &dyn NativeDriver, worker: &WorkerCtx) {
    if let Some(binding) = worker.current {
        driver.make_current(binding.dpy, binding.draw, binding.read, Some(binding.ctx));
    }
}

/// Unbinds from the calling OS thread, keeping the record in `worker`.
pub(crate) fn unbind_worker(driver: &dyn NativeDriver, worker: &WorkerCtx) {
    if let Some(binding) = worker.current {
        driver.make_current(binding.dpy, None, None, None);
    }
}

pub(crate) fn release_worker(
    driver: &dyn NativeDriver,
    worker: &mut WorkerCtx,
    force: bool,
) -> bool {
    debug_assert!(worker.current.is_some());
    let Some(binding) = worker.current else {
        return false;
    };
    let ok = driver.make_current(binding.dpy, None, None, None);
    if ok || force {
        worker.current = None;
    }
    ok || force
}
