//! Guest-visible EGL contexts.

use std::sync::{Arc, Mutex};

use crate::backend::BackendContext;
use crate::display::EglConfig;
use crate::driver::NativeContext;
use crate::handle::HostHandle;
use crate::surface::EglSurface;

#[derive(Default)]
struct SurfaceBindings {
    draw: Option<Arc<EglSurface>>,
    read: Option<Arc<EglSurface>>,
}

pub struct EglContext {
    handle: HostHandle,
    dpy: HostHandle,
    config: Arc<EglConfig>,
    /// Client API version from `EGL_CONTEXT_CLIENT_VERSION`. Advisory; the
    /// backends hand out whatever the native driver supports.
    version: i32,
    backend: Box<dyn BackendContext>,
    bindings: Mutex<SurfaceBindings>,
}

impl EglContext {
    pub(crate) fn new(
        handle: HostHandle,
        dpy: HostHandle,
        config: Arc<EglConfig>,
        version: i32,
        backend: Box<dyn BackendContext>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handle,
            dpy,
            config,
            version,
            backend,
            bindings: Mutex::new(SurfaceBindings::default()),
        })
    }

    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    /// Handle of the display the context was created on.
    pub fn display(&self) -> HostHandle {
        self.dpy
    }

    pub fn config(&self) -> &Arc<EglConfig> {
        &self.config
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub(crate) fn native(&self) -> NativeContext {
        self.backend.native()
    }

    pub fn draw_surface(&self) -> Option<Arc<EglSurface>> {
        self.bindings.lock().unwrap().draw.clone()
    }

    pub fn read_surface(&self) -> Option<Arc<EglSurface>> {
        self.bindings.lock().unwrap().read.clone()
    }

    pub(crate) fn binds_surface(&self, handle: HostHandle) -> bool {
        let b = self.bindings.lock().unwrap();
        b.draw.as_ref().map(|s| s.handle()) == Some(handle)
            || b.read.as_ref().map(|s| s.handle()) == Some(handle)
    }

    /// Records the surfaces made current with this context. Bind counts on
    /// the incoming pair are taken before the outgoing pair is released, so
    /// re-binding the same surface never drops its count to zero in
    /// between.
    pub(crate) fn update_surfaces(
        &self,
        draw: Option<Arc<EglSurface>>,
        read: Option<Arc<EglSurface>>,
    ) {
        if let Some(s) = &draw {
            s.bind();
        }
        if let Some(s) = &read {
            s.bind();
        }
        let (old_draw, old_read) = {
            let mut b = self.bindings.lock().unwrap();
            (
                std::mem::replace(&mut b.draw, draw),
                std::mem::replace(&mut b.read, read),
            )
        };
        if let Some(s) = &old_draw {
            s.unbind();
        }
        if let Some(s) = &old_read {
            s.unbind();
        }
    }
}
