//! Onscreen rendering strategy.
//!
//! Guest window surfaces map onto winsys buffers the emulator UI owns and
//! composites. The native driver still only sees pbuffers: every surface
//! carries a dummy 1x1 pbuffer as its binding anchor, and presenting a
//! frame means flushing and marking the winsys buffer dirty so the UI
//! picks it up on its next frame. Pixels never travel through guest
//! memory on this path.

use std::sync::Arc;

use tracing::{error, warn};

use crate::attribs::{EGL_HEIGHT, EGL_WIDTH};
use crate::backend::{
    rebind_worker, release_worker, unbind_worker, BackendContext, BackendDisplay, BackendImage,
    BackendSurface, EglBackend, EnsureCtx, WorkerCtx,
};
use crate::config::ConfigAttribs;
use crate::driver::{CurrentBinding, NativeContext, NativeDisplay, NativeDriver, NativeSurface};
use crate::surface::SurfaceKind;

/// A UI-owned buffer a surface can render into. Dropping the handle
/// releases the UI's reference.
pub trait WinsysSurface: Send + Sync {
    fn id(&self) -> u32;

    fn dimensions(&self) -> (u32, u32);

    /// Marks the buffer as holding a new frame. The UI composites dirty
    /// buffers on its next pass.
    fn set_dirty(&self);
}

/// The emulator UI side of the onscreen contract: buffers are registered
/// there under winsys ids and looked up here at surface creation and
/// invalidation time.
pub trait WinsysInterface: Send + Sync {
    fn acquire_surface(&self, id: u32) -> Option<Arc<dyn WinsysSurface>>;
}

pub struct OnscreenBackend {
    driver: Arc<dyn NativeDriver>,
    winsys: Arc<dyn WinsysInterface>,
    ensure: EnsureCtx,
    /// Stand-in native surface for surfaceless `make_current`; onscreen
    /// contexts render into framebuffers, not the bound surface.
    null_sfc: NativeSurface,
}

impl OnscreenBackend {
    pub fn new(
        driver: Arc<dyn NativeDriver>,
        winsys: Arc<dyn WinsysInterface>,
    ) -> Option<Self> {
        let ensure = EnsureCtx::create(driver.as_ref())?;
        let Some(null_sfc) =
            driver.pbuffer_surface_create(ensure.display(), ensure.config(), 1, 1)
        else {
            ensure.destroy(driver.as_ref());
            return None;
        };
        Some(Self {
            driver,
            winsys,
            ensure,
            null_sfc,
        })
    }
}

impl Drop for OnscreenBackend {
    fn drop(&mut self) {
        self.driver
            .pbuffer_surface_destroy(self.ensure.display(), self.null_sfc);
        self.ensure.destroy(self.driver.as_ref());
    }
}

impl EglBackend for OnscreenBackend {
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
        Some(Box::new(OnscreenDisplay {
            driver: self.driver.clone(),
            winsys: self.winsys.clone(),
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
            self.driver.flush();
        }
        let draw = draw.unwrap_or(self.null_sfc);
        let read = read.unwrap_or(self.null_sfc);
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

struct OnscreenDisplay {
    driver: Arc<dyn NativeDriver>,
    winsys: Arc<dyn WinsysInterface>,
    native: NativeDisplay,
    global_ctx: NativeContext,
}

impl Drop for OnscreenDisplay {
    fn drop(&mut self) {
        self.driver.display_close(self.native);
    }
}

impl BackendDisplay for OnscreenDisplay {
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
        // Everything already shares through the global root context, which
        // is what makes winsys buffers visible across guest contexts.
        let native = self
            .driver
            .context_create(self.native, cfg, Some(self.global_ctx))?;
        Some(Box::new(OnscreenContext {
            driver: self.driver.clone(),
            dpy: self.native,
            native,
        }))
    }

    fn create_offscreen_surface(
        &self,
        _cfg: &ConfigAttribs,
        _kind: SurfaceKind,
        _width: u32,
        _height: u32,
        _bpp: u32,
        _pixels_va: u64,
    ) -> Option<Box<dyn BackendSurface>> {
        error!("guest pixel-buffer surfaces require the offscreen backend");
        None
    }

    fn create_onscreen_surface(
        &self,
        cfg: &ConfigAttribs,
        kind: SurfaceKind,
        winsys_id: u32,
    ) -> Option<Box<dyn BackendSurface>> {
        let Some(ws_sfc) = self.winsys.acquire_surface(winsys_id) else {
            warn!(winsys_id, "winsys surface not found");
            return None;
        };
        let native = self.driver.pbuffer_surface_create(self.native, cfg, 1, 1)?;
        Some(Box::new(OnscreenSurface {
            driver: self.driver.clone(),
            winsys: self.winsys.clone(),
            dpy: self.native,
            kind,
            native,
            ws_sfc,
        }))
    }

    fn create_image(&self, buffer: u32) -> Option<Box<dyn BackendImage>> {
        let ws_sfc = self.winsys.acquire_surface(buffer)?;
        Some(Box::new(OnscreenImage { _ws_sfc: ws_sfc }))
    }
}

struct OnscreenContext {
    driver: Arc<dyn NativeDriver>,
    dpy: NativeDisplay,
    native: NativeContext,
}

impl Drop for OnscreenContext {
    fn drop(&mut self) {
        self.driver.context_destroy(self.dpy, self.native);
    }
}

impl BackendContext for OnscreenContext {
    fn native(&self) -> NativeContext {
        self.native
    }
}

struct OnscreenSurface {
    driver: Arc<dyn NativeDriver>,
    winsys: Arc<dyn WinsysInterface>,
    dpy: NativeDisplay,
    kind: SurfaceKind,
    /// Binding anchor only; rendering goes to the winsys buffer.
    native: NativeSurface,
    ws_sfc: Arc<dyn WinsysSurface>,
}

impl OnscreenSurface {
    fn present(&self) {
        self.driver.flush();
        self.ws_sfc.set_dirty();
    }
}

impl Drop for OnscreenSurface {
    fn drop(&mut self) {
        self.driver.pbuffer_surface_destroy(self.dpy, self.native);
    }
}

impl BackendSurface for OnscreenSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn native(&self) -> NativeSurface {
        self.native
    }

    fn query(&self, attribute: i32) -> Option<i32> {
        let (width, height) = self.ws_sfc.dimensions();
        match attribute {
            EGL_WIDTH => Some(width as i32),
            EGL_HEIGHT => Some(height as i32),
            _ => None,
        }
    }

    fn swap_buffers(&mut self) -> bool {
        self.present();
        true
    }

    fn copy_buffers(&mut self) -> bool {
        self.present();
        true
    }

    fn wait_gl(&mut self) {
        self.present();
    }

    fn invalidate(&mut self, winsys_id: u32) {
        let Some(ws_sfc) = self.winsys.acquire_surface(winsys_id) else {
            warn!(winsys_id, "winsys surface not found");
            return;
        };
        if Arc::ptr_eq(&ws_sfc, &self.ws_sfc) {
            return;
        }
        self.ws_sfc = ws_sfc;
    }
}

/// Keeps the shared winsys buffer alive for as long as any context holds
/// the image.
struct OnscreenImage {
    _ws_sfc: Arc<dyn WinsysSurface>,
}

impl BackendImage for OnscreenImage {}
