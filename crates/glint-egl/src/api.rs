//! Validating EGL entry points and per-thread current state.
//!
//! Every operation validates handles before touching the backend and
//! reports failures two ways at once: the returned [`EglResult`] carries
//! the error for the caller to marshal back, and the thread state keeps the
//! first error since the last `get_error` for the `eglGetError` path. The
//! validators set the sticky error at the failure site, so entry points can
//! bail with `?` without an extra bookkeeping step.
//!
//! On failure the thread's current-context state is never changed; a
//! `make_current` that the backend refuses leaves the previous binding
//! fully intact.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::attribs::*;
use crate::backend::{BackendImage, EglBackend, WorkerCtx};
use crate::config::{parse_criteria, ConfigSelect};
use crate::context::EglContext;
use crate::display::{EglConfig, EglDisplay};
use crate::error::{EglError, EglResult, EGL_SUCCESS};
use crate::handle::{HandleAllocator, HostHandle};
use crate::surface::{
    validate_pixmap_attribs, validate_window_attribs, EglSurface, PbufferAttribs, SurfaceKind,
};

/// Per guest thread EGL state: the bound client API, the current context,
/// and the last unreported error.
pub struct EglThread {
    worker: WorkerCtx,
    api: i32,
    context: Option<Arc<EglContext>>,
    error: Option<EglError>,
}

impl EglThread {
    pub fn new() -> Self {
        Self {
            worker: WorkerCtx::new(),
            api: EGL_OPENGL_ES_API,
            context: None,
            error: None,
        }
    }

    pub fn current_context(&self) -> Option<Arc<EglContext>> {
        self.context.clone()
    }

    pub fn bound_api(&self) -> i32 {
        self.api
    }

    /// First error wins; later failures before a `get_error` are dropped,
    /// matching how a guest polling `eglGetError` after a burst of calls
    /// expects to see the original cause.
    fn set_error(&mut self, error: EglError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl Default for EglThread {
    fn default() -> Self {
        Self::new()
    }
}

/// Per guest process EGL state: the display registry and the backend all
/// objects are created through.
pub struct EglApi {
    backend: Arc<dyn EglBackend>,
    displays: Mutex<Vec<Arc<EglDisplay>>>,
    handles: Arc<HandleAllocator>,
}

impl EglApi {
    pub fn new(backend: Arc<dyn EglBackend>) -> Self {
        Self {
            backend,
            displays: Mutex::new(Vec::new()),
            handles: Arc::new(HandleAllocator::new()),
        }
    }

    /* ------------------------- thread lifecycle ------------------------- */

    pub fn thread_init(&self, ts: &mut EglThread) {
        self.backend.thread_init(&mut ts.worker);
    }

    /// Force-releases anything still current and tears the worker binding
    /// down. Called when the guest thread detaches without cleaning up.
    pub fn thread_fini(&self, ts: &mut EglThread) {
        if let Some(ctx) = ts.context.take() {
            self.backend.release_current(&mut ts.worker, true);
            ctx.update_surfaces(None, None);
        }
        self.backend.thread_fini(&mut ts.worker);
    }

    pub fn batch_start(&self, ts: &mut EglThread) {
        self.backend.batch_start(&mut ts.worker);
    }

    pub fn batch_end(&self, ts: &mut EglThread) {
        self.backend.batch_end(&mut ts.worker);
    }

    /* ----------------------------- displays ----------------------------- */

    /// Registry lookup keyed by the guest-side display id; creates the
    /// display on first sight. Returns 0 when the backend refuses one.
    pub fn get_display(&self, display_id: u32) -> HostHandle {
        let mut displays = self.displays.lock().unwrap();
        if let Some(dpy) = displays.iter().find(|d| d.display_id() == display_id) {
            return dpy.handle();
        }
        let Some(backend_dpy) = self.backend.create_display() else {
            warn!(display_id, "backend refused a display");
            return 0;
        };
        let handle = self.handles.alloc();
        let dpy = EglDisplay::new(handle, display_id, Arc::from(backend_dpy), self.handles.clone());
        displays.push(dpy);
        handle
    }

    pub fn initialize(&self, ts: &mut EglThread, dpy_h: HostHandle) -> EglResult<(i32, i32)> {
        let Some(dpy) = self.display_by_handle(dpy_h) else {
            return self.err(ts, EglError::BadDisplay);
        };
        Ok(dpy.initialize())
    }

    pub fn terminate(&self, ts: &mut EglThread, dpy_h: HostHandle) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        // A context current on this thread does not survive its display.
        if let Some(ctx) = ts.context.clone() {
            if ctx.display() == dpy.handle() {
                self.backend.release_current(&mut ts.worker, true);
                ctx.update_surfaces(None, None);
                ts.context = None;
            }
        }
        dpy.terminate();
        Ok(())
    }

    /* ------------------------------ configs ------------------------------ */

    /// All registered config handles, in registration order. The caller
    /// slices to the guest's array capacity.
    pub fn get_configs(&self, ts: &mut EglThread, dpy_h: HostHandle) -> EglResult<Vec<HostHandle>> {
        let dpy = self.validate_display(ts, dpy_h)?;
        Ok(dpy.configs().iter().map(|c| c.handle()).collect())
    }

    pub fn choose_config(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        attribs: &[i32],
    ) -> EglResult<Vec<HostHandle>> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let select = match parse_criteria(attribs) {
            Ok(select) => select,
            Err(e) => return self.err(ts, e),
        };
        let chosen = dpy.choose(&select);
        if chosen.is_empty() {
            if let ConfigSelect::ById(_) = select {
                // An explicit id names a config that must exist.
                return self.err(ts, EglError::BadAttribute);
            }
        }
        Ok(chosen.iter().map(|c| c.handle()).collect())
    }

    pub fn get_config_attrib(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        attribute: i32,
    ) -> EglResult<i32> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        match cfg.attribs().get_attrib(attribute) {
            Some(v) => Ok(v),
            None => self.err(ts, EglError::BadAttribute),
        }
    }

    /* ----------------------------- surfaces ----------------------------- */

    pub fn create_window_surface_offscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        // Window attribute validation precedes display validation; a bad
        // list rejects even on a bogus display.
        if let Err(e) = validate_window_attribs(attribs) {
            return self.err(ts, e);
        }
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        self.offscreen_surface_tail(
            ts,
            &dpy,
            cfg,
            SurfaceKind::Window,
            PbufferAttribs::default(),
            width,
            height,
            bpp,
            pixels_va,
        )
    }

    pub fn create_pbuffer_surface_offscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        let pb = match PbufferAttribs::parse(attribs) {
            Ok(pb) => pb,
            Err(e) => return self.err(ts, e),
        };
        self.offscreen_surface_tail(
            ts,
            &dpy,
            cfg,
            SurfaceKind::Pbuffer,
            pb,
            width,
            height,
            bpp,
            pixels_va,
        )
    }

    pub fn create_pixmap_surface_offscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        if let Err(e) = validate_pixmap_attribs(attribs) {
            return self.err(ts, e);
        }
        self.offscreen_surface_tail(
            ts,
            &dpy,
            cfg,
            SurfaceKind::Pixmap,
            PbufferAttribs::default(),
            width,
            height,
            bpp,
            pixels_va,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn offscreen_surface_tail(
        &self,
        ts: &mut EglThread,
        dpy: &Arc<EglDisplay>,
        cfg: Arc<EglConfig>,
        kind: SurfaceKind,
        pb: PbufferAttribs,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
    ) -> EglResult<HostHandle> {
        let backend_sfc = dpy
            .backend()
            .create_offscreen_surface(cfg.attribs(), kind, width, height, bpp, pixels_va);
        let Some(backend_sfc) = backend_sfc else {
            return self.err(ts, surface_create_error(kind));
        };
        let handle = self.handles.alloc();
        dpy.add_surface(EglSurface::new(handle, cfg, kind, pb, backend_sfc));
        Ok(handle)
    }

    pub fn create_window_surface_onscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        winsys_id: u32,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        if let Err(e) = validate_window_attribs(attribs) {
            return self.err(ts, e);
        }
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        self.onscreen_surface_tail(
            ts,
            &dpy,
            cfg,
            SurfaceKind::Window,
            PbufferAttribs::default(),
            winsys_id,
        )
    }

    pub fn create_pbuffer_surface_onscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        winsys_id: u32,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        let pb = match PbufferAttribs::parse(attribs) {
            Ok(pb) => pb,
            Err(e) => return self.err(ts, e),
        };
        self.onscreen_surface_tail(ts, &dpy, cfg, SurfaceKind::Pbuffer, pb, winsys_id)
    }

    pub fn create_pixmap_surface_onscreen(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        winsys_id: u32,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        if let Err(e) = validate_pixmap_attribs(attribs) {
            return self.err(ts, e);
        }
        self.onscreen_surface_tail(
            ts,
            &dpy,
            cfg,
            SurfaceKind::Pixmap,
            PbufferAttribs::default(),
            winsys_id,
        )
    }

    fn onscreen_surface_tail(
        &self,
        ts: &mut EglThread,
        dpy: &Arc<EglDisplay>,
        cfg: Arc<EglConfig>,
        kind: SurfaceKind,
        pb: PbufferAttribs,
        winsys_id: u32,
    ) -> EglResult<HostHandle> {
        let backend_sfc = dpy
            .backend()
            .create_onscreen_surface(cfg.attribs(), kind, winsys_id);
        let Some(backend_sfc) = backend_sfc else {
            return self.err(ts, surface_create_error(kind));
        };
        let handle = self.handles.alloc();
        dpy.add_surface(EglSurface::new(handle, cfg, kind, pb, backend_sfc));
        Ok(handle)
    }

    /// Fails while the surface is bound to any current context.
    pub fn destroy_surface(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        match dpy.remove_surface(sfc_h) {
            Ok(()) => Ok(()),
            Err(e) => self.err(ts, e),
        }
    }

    pub fn query_surface(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
        attribute: i32,
    ) -> EglResult<Option<i32>> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        match sfc.query(attribute) {
            Ok(v) => Ok(v),
            Err(e) => self.err(ts, e),
        }
    }

    pub fn surface_attrib(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
        attribute: i32,
        value: i32,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        match sfc.set_attrib(attribute, value) {
            Ok(()) => Ok(()),
            Err(e) => self.err(ts, e),
        }
    }

    pub fn swap_buffers(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        if !sfc.swap_buffers() {
            warn!(surface = sfc_h, "swap did not reach the guest buffer");
        }
        Ok(())
    }

    pub fn copy_buffers(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        if !sfc.copy_buffers() {
            warn!(surface = sfc_h, "copy did not reach the guest buffer");
        }
        Ok(())
    }

    /// Recreates the backing target of an offscreen surface with new
    /// dimensions and a new guest pixel buffer. Requires a current context
    /// because the swap has to rebind whatever is current over the new
    /// target before the old one dies.
    #[allow(clippy::too_many_arguments)]
    pub fn resize_offscreen_surface(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
        width: u32,
        height: u32,
        bpp: u32,
        pixels_va: u64,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        let Some(ctx) = ts.context.clone() else {
            return self.err(ts, EglError::BadContext);
        };
        let new_backend = dpy.backend().create_offscreen_surface(
            sfc.config().attribs(),
            sfc.kind(),
            width,
            height,
            bpp,
            pixels_va,
        );
        let Some(new_backend) = new_backend else {
            return self.err(ts, EglError::BadAlloc);
        };

        let new_native = new_backend.native();
        let substitute = |s: Option<Arc<EglSurface>>| {
            s.map(|s| {
                if s.handle() == sfc_h {
                    new_native
                } else {
                    s.native()
                }
            })
        };
        let draw = substitute(ctx.draw_surface());
        let read = substitute(ctx.read_surface());
        let ok = self
            .backend
            .make_current(&mut ts.worker, dpy.native(), ctx.native(), draw, read);
        if !ok {
            return self.err(ts, EglError::BadAlloc);
        }
        sfc.replace_backend(new_backend);
        Ok(())
    }

    /// Rebinds an onscreen surface to the winsys buffer the UI recreated.
    pub fn invalidate_onscreen_surface(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        sfc_h: HostHandle,
        buffer: u32,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let sfc = self.validate_surface(ts, &dpy, sfc_h)?;
        sfc.invalidate(buffer);
        Ok(())
    }

    /// Wraps a winsys buffer for cross-context sharing. The caller owns the
    /// returned image and its registration under a guest texture name.
    pub fn create_image(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        buffer: u32,
    ) -> EglResult<Box<dyn BackendImage>> {
        let dpy = self.validate_display(ts, dpy_h)?;
        match dpy.backend().create_image(buffer) {
            Some(image) => Ok(image),
            None => self.err(ts, EglError::BadAlloc),
        }
    }

    /* ----------------------------- contexts ----------------------------- */

    pub fn create_context(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        cfg_h: HostHandle,
        share_h: HostHandle,
        attribs: &[i32],
    ) -> EglResult<HostHandle> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let cfg = self.validate_config(ts, &dpy, cfg_h)?;
        let share = if share_h != 0 {
            Some(self.validate_context(ts, &dpy, share_h)?)
        } else {
            None
        };
        let mut version = 1;
        if ts.api == EGL_OPENGL_ES_API {
            // Only the client version is meaningful for ES contexts; other
            // tokens pass through without effect.
            for (token, value) in attrib_pairs(attribs) {
                if token == EGL_CONTEXT_CLIENT_VERSION {
                    version = value;
                }
            }
        }
        let backend_ctx = dpy
            .backend()
            .create_context(cfg.attribs(), share.as_ref().map(|c| c.native()));
        let Some(backend_ctx) = backend_ctx else {
            return self.err(ts, EglError::BadMatch);
        };
        let handle = self.handles.alloc();
        dpy.add_context(EglContext::new(
            handle,
            dpy.handle(),
            cfg,
            version,
            backend_ctx,
        ));
        Ok(handle)
    }

    pub fn destroy_context(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        ctx_h: HostHandle,
    ) -> EglResult<()> {
        let dpy = self.validate_display(ts, dpy_h)?;
        match dpy.remove_context(ctx_h) {
            Ok(()) => Ok(()),
            Err(e) => self.err(ts, e),
        }
    }

    pub fn query_context(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        ctx_h: HostHandle,
        attribute: i32,
    ) -> EglResult<i32> {
        let dpy = self.validate_display(ts, dpy_h)?;
        let ctx = self.validate_context(ts, &dpy, ctx_h)?;
        let v = match attribute {
            EGL_CONFIG_ID => ctx.config().id(),
            EGL_CONTEXT_CLIENT_TYPE => EGL_OPENGL_ES_API,
            EGL_CONTEXT_CLIENT_VERSION => ctx.version(),
            EGL_RENDER_BUFFER => match ctx.draw_surface() {
                Some(s) => match s.kind() {
                    SurfaceKind::Window | SurfaceKind::Pbuffer => EGL_BACK_BUFFER,
                    SurfaceKind::Pixmap => EGL_SINGLE_BUFFER,
                },
                None => EGL_NONE,
            },
            _ => return self.err(ts, EglError::BadAttribute),
        };
        Ok(v)
    }

    /// The current-binding state machine. All-null releases; otherwise the
    /// request is validated in full before any state changes, and a backend
    /// refusal leaves the previous binding untouched.
    pub fn make_current(
        &self,
        ts: &mut EglThread,
        dpy_h: HostHandle,
        draw_h: HostHandle,
        read_h: HostHandle,
        ctx_h: HostHandle,
    ) -> EglResult<()> {
        if ctx_h == 0 && draw_h == 0 && read_h == 0 {
            return self.release_current(ts, dpy_h);
        }
        if ctx_h == 0 {
            // Surfaces without a context have no meaning.
            return self.err(ts, EglError::BadMatch);
        }
        let dpy = self.validate_display(ts, dpy_h)?;
        let ctx = self.validate_context(ts, &dpy, ctx_h)?;
        let draw = if draw_h != 0 {
            Some(self.validate_surface(ts, &dpy, draw_h)?)
        } else {
            None
        };
        let read = if read_h != 0 {
            Some(self.validate_surface(ts, &dpy, read_h)?)
        } else {
            None
        };

        let ok = self.backend.make_current(
            &mut ts.worker,
            dpy.native(),
            ctx.native(),
            draw.as_ref().map(|s| s.native()),
            read.as_ref().map(|s| s.native()),
        );
        if !ok {
            return self.err(ts, EglError::BadAccess);
        }

        let prev = ts.context.take();
        ctx.update_surfaces(draw, read);
        if let Some(prev) = prev {
            if prev.handle() != ctx.handle() {
                prev.update_surfaces(None, None);
            }
        }
        ts.context = Some(ctx);
        Ok(())
    }

    /// The all-null arm of `make_current`. A null display is fine here;
    /// the current context knows which display it lives on.
    fn release_current(&self, ts: &mut EglThread, dpy_h: HostHandle) -> EglResult<()> {
        if dpy_h != 0 && self.display_by_handle(dpy_h).is_none() {
            return self.err(ts, EglError::BadDisplay);
        }
        let Some(ctx) = ts.context.clone() else {
            return Ok(());
        };
        if !self.backend.release_current(&mut ts.worker, false) {
            return self.err(ts, EglError::BadAccess);
        }
        ctx.update_surfaces(None, None);
        ts.context = None;
        Ok(())
    }

    /* --------------------------- thread calls --------------------------- */

    /// Only ES is served here; binding another API would promise calls the
    /// device cannot route.
    pub fn bind_api(&self, ts: &mut EglThread, api: i32) -> EglResult<()> {
        if api != EGL_OPENGL_ES_API {
            return self.err(ts, EglError::BadParameter);
        }
        ts.api = api;
        Ok(())
    }

    pub fn query_api(&self, ts: &EglThread) -> i32 {
        ts.api
    }

    /// Returns and clears the sticky error.
    pub fn get_error(&self, ts: &mut EglThread) -> u32 {
        match ts.error.take() {
            Some(e) => e.code(),
            None => EGL_SUCCESS,
        }
    }

    /// Waits for client API rendering on the current draw surface. Nothing
    /// current means nothing to wait for.
    pub fn wait_client(&self, ts: &mut EglThread) -> EglResult<()> {
        if let Some(sfc) = ts.context.as_ref().and_then(|c| c.draw_surface()) {
            sfc.wait_gl();
        }
        Ok(())
    }

    /// Native rendering never targets guest surfaces, so there is nothing
    /// to synchronize against.
    pub fn wait_native(&self, ts: &mut EglThread) -> EglResult<()> {
        let _ = ts;
        Ok(())
    }

    /// Releases the current context and resets the thread state to its
    /// initial values.
    pub fn release_thread(&self, ts: &mut EglThread) -> EglResult<()> {
        if let Some(ctx) = ts.context.clone() {
            if !self.backend.release_current(&mut ts.worker, false) {
                return self.err(ts, EglError::BadAccess);
            }
            ctx.update_surfaces(None, None);
            ts.context = None;
        }
        ts.api = EGL_OPENGL_ES_API;
        ts.error = None;
        Ok(())
    }

    /* ----------------------------- validators ---------------------------- */

    fn err<T>(&self, ts: &mut EglThread, error: EglError) -> EglResult<T> {
        ts.set_error(error);
        Err(error)
    }

    fn display_by_handle(&self, handle: HostHandle) -> Option<Arc<EglDisplay>> {
        self.displays
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.handle() == handle)
            .cloned()
    }

    fn validate_display(
        &self,
        ts: &mut EglThread,
        handle: HostHandle,
    ) -> EglResult<Arc<EglDisplay>> {
        let Some(dpy) = self.display_by_handle(handle) else {
            return self.err(ts, EglError::BadDisplay);
        };
        if !dpy.is_initialized() {
            return self.err(ts, EglError::NotInitialized);
        }
        Ok(dpy)
    }

    fn validate_config(
        &self,
        ts: &mut EglThread,
        dpy: &Arc<EglDisplay>,
        handle: HostHandle,
    ) -> EglResult<Arc<EglConfig>> {
        match dpy.config_by_handle(handle) {
            Some(cfg) => Ok(cfg),
            None => self.err(ts, EglError::BadConfig),
        }
    }

    fn validate_surface(
        &self,
        ts: &mut EglThread,
        dpy: &Arc<EglDisplay>,
        handle: HostHandle,
    ) -> EglResult<Arc<EglSurface>> {
        match dpy.surface_by_handle(handle) {
            Some(sfc) => Ok(sfc),
            None => self.err(ts, EglError::BadSurface),
        }
    }

    fn validate_context(
        &self,
        ts: &mut EglThread,
        dpy: &Arc<EglDisplay>,
        handle: HostHandle,
    ) -> EglResult<Arc<EglContext>> {
        match dpy.context_by_handle(handle) {
            Some(ctx) => Ok(ctx),
            None => self.err(ts, EglError::BadContext),
        }
    }
}

fn surface_create_error(kind: SurfaceKind) -> EglError {
    match kind {
        SurfaceKind::Window => EglError::BadNativeWindow,
        SurfaceKind::Pbuffer => EglError::BadAlloc,
        SurfaceKind::Pixmap => EglError::BadNativePixmap,
    }
}
