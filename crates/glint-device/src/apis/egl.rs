//! EGL dispatcher: wire calls to [`glint_egl::EglApi`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glint_egl::{BackendImage, EglApi, EglBackend, EglThread};
use glint_protocol::EglFunc;
use tracing::warn;

use crate::api::{ApiProcess, CallCtx, DispatchError};
use crate::apis::egl_funcs;
use crate::object_map::{MapObject, ObjectMap};

/// An EGLImage registered under the guest texture name that will source it.
pub(crate) struct EglImageObject {
    buffer: u32,
    _image: Box<dyn BackendImage>,
}

impl EglImageObject {
    pub(crate) fn new(buffer: u32, image: Box<dyn BackendImage>) -> Self {
        Self {
            buffer,
            _image: image,
        }
    }
}

impl MapObject for EglImageObject {
    fn global_name(&self) -> u32 {
        self.buffer
    }
}

/// Per-process EGL state: the validating API object plus one [`EglThread`]
/// per attached guest thread.
pub struct EglApiProcess {
    api: Arc<EglApi>,
    threads: HashMap<u32, EglThread>,
    object_map: Arc<Mutex<ObjectMap>>,
}

impl EglApiProcess {
    pub fn new(backend: Arc<dyn EglBackend>, object_map: Arc<Mutex<ObjectMap>>) -> Self {
        Self {
            api: Arc::new(EglApi::new(backend)),
            threads: HashMap::new(),
            object_map,
        }
    }

    pub fn api(&self) -> &Arc<EglApi> {
        &self.api
    }
}

impl ApiProcess for EglApiProcess {
    fn thread_init(&mut self, tid: u32) {
        let mut ts = EglThread::new();
        self.api.thread_init(&mut ts);
        if self.threads.insert(tid, ts).is_some() {
            warn!(tid, "thread state already existed at init");
        }
    }

    fn thread_fini(&mut self, tid: u32) {
        match self.threads.remove(&tid) {
            Some(mut ts) => self.api.thread_fini(&mut ts),
            None => warn!(tid, "thread state missing at fini"),
        }
    }

    fn batch_start(&mut self, tid: u32) {
        if let Some(ts) = self.threads.get_mut(&tid) {
            self.api.batch_start(ts);
        }
    }

    fn batch_end(&mut self, tid: u32) {
        if let Some(ts) = self.threads.get_mut(&tid) {
            self.api.batch_end(ts);
        }
    }

    fn dispatch(&mut self, func_id: u32, ctx: &mut CallCtx<'_>) -> Result<(), DispatchError> {
        let Some(func) = EglFunc::from_u32(func_id) else {
            return Err(DispatchError::UnknownFunc(func_id));
        };
        let ts = self
            .threads
            .get_mut(&ctx.tid)
            .ok_or(DispatchError::UnknownThread(ctx.tid))?;
        let api = &self.api;
        match func {
            EglFunc::GetDisplay => egl_funcs::get_display(api, ts, ctx)?,
            EglFunc::Initialize => egl_funcs::initialize(api, ts, ctx)?,
            EglFunc::Terminate => egl_funcs::terminate(api, ts, ctx)?,
            EglFunc::GetConfigs => egl_funcs::get_configs(api, ts, ctx)?,
            EglFunc::ChooseConfig => egl_funcs::choose_config(api, ts, ctx)?,
            EglFunc::GetConfigAttrib => egl_funcs::get_config_attrib(api, ts, ctx)?,
            EglFunc::DestroySurface => egl_funcs::destroy_surface(api, ts, ctx)?,
            EglFunc::QuerySurface => egl_funcs::query_surface(api, ts, ctx)?,
            EglFunc::BindApi => egl_funcs::bind_api(api, ts, ctx)?,
            EglFunc::WaitClient => egl_funcs::wait_client(api, ts, ctx)?,
            EglFunc::ReleaseThread => egl_funcs::release_thread(api, ts, ctx)?,
            EglFunc::SurfaceAttrib => egl_funcs::surface_attrib(api, ts, ctx)?,
            EglFunc::CreateContext => egl_funcs::create_context(api, ts, ctx)?,
            EglFunc::DestroyContext => egl_funcs::destroy_context(api, ts, ctx)?,
            EglFunc::MakeCurrent => egl_funcs::make_current(api, ts, ctx)?,
            EglFunc::QueryContext => egl_funcs::query_context(api, ts, ctx)?,
            EglFunc::SwapBuffers => egl_funcs::swap_buffers(api, ts, ctx)?,
            EglFunc::CopyBuffers => egl_funcs::copy_buffers(api, ts, ctx)?,
            EglFunc::CreateWindowSurfaceOffscreen => {
                egl_funcs::create_window_surface_offscreen(api, ts, ctx)?
            }
            EglFunc::CreatePbufferSurfaceOffscreen => {
                egl_funcs::create_pbuffer_surface_offscreen(api, ts, ctx)?
            }
            EglFunc::CreatePixmapSurfaceOffscreen => {
                egl_funcs::create_pixmap_surface_offscreen(api, ts, ctx)?
            }
            EglFunc::ResizeOffscreenSurface => {
                egl_funcs::resize_offscreen_surface(api, ts, ctx)?
            }
            EglFunc::CreateWindowSurfaceOnscreen => {
                egl_funcs::create_window_surface_onscreen(api, ts, ctx)?
            }
            EglFunc::CreatePbufferSurfaceOnscreen => {
                egl_funcs::create_pbuffer_surface_onscreen(api, ts, ctx)?
            }
            EglFunc::CreatePixmapSurfaceOnscreen => {
                egl_funcs::create_pixmap_surface_onscreen(api, ts, ctx)?
            }
            EglFunc::InvalidateOnscreenSurface => {
                egl_funcs::invalidate_onscreen_surface(api, ts, ctx)?
            }
            EglFunc::CreateImage => egl_funcs::create_image(api, ts, &self.object_map, ctx)?,
        }
        Ok(())
    }
}
