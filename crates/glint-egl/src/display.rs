//! Guest-visible EGL displays and the config/surface/context registries
//! that hang off them.
//!
//! A display owns three registries behind one lock. Terminate empties them
//! but objects stay alive while something else still holds an `Arc`, the
//! way a current context survives its display being terminated.

use std::sync::{Arc, Mutex};

use crate::backend::BackendDisplay;
use crate::config::{ConfigAttribs, ConfigSelect};
use crate::context::EglContext;
use crate::driver::NativeDisplay;
use crate::error::{EglError, EglResult};
use crate::handle::{HandleAllocator, HostHandle};
use crate::surface::EglSurface;

/// Version reported by `eglInitialize`.
pub const EGL_VERSION: (i32, i32) = (1, 4);

/// A registered config. Cleanup of the driver-side cookie runs when the
/// last reference goes away, not at terminate time, because surfaces and
/// contexts keep their config alive.
pub struct EglConfig {
    handle: HostHandle,
    attribs: ConfigAttribs,
    backend: Arc<dyn BackendDisplay>,
}

impl EglConfig {
    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    pub fn attribs(&self) -> &ConfigAttribs {
        &self.attribs
    }

    pub fn id(&self) -> i32 {
        self.attribs.config_id
    }
}

impl Drop for EglConfig {
    fn drop(&mut self) {
        self.backend.config_cleanup(&self.attribs);
    }
}

#[derive(Default)]
struct DisplayState {
    initialized: bool,
    configs: Vec<Arc<EglConfig>>,
    surfaces: Vec<Arc<EglSurface>>,
    contexts: Vec<Arc<EglContext>>,
}

pub struct EglDisplay {
    handle: HostHandle,
    display_id: u32,
    backend: Arc<dyn BackendDisplay>,
    handles: Arc<HandleAllocator>,
    state: Mutex<DisplayState>,
}

impl EglDisplay {
    pub(crate) fn new(
        handle: HostHandle,
        display_id: u32,
        backend: Arc<dyn BackendDisplay>,
        handles: Arc<HandleAllocator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handle,
            display_id,
            backend,
            handles,
            state: Mutex::new(DisplayState::default()),
        })
    }

    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    /// Guest-side display id this object was registered under.
    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    pub(crate) fn backend(&self) -> &Arc<dyn BackendDisplay> {
        &self.backend
    }

    pub(crate) fn native(&self) -> NativeDisplay {
        self.backend.native()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unwrap().initialized
    }

    /// Enumerates, filters, orders and registers the backend's configs.
    /// Idempotent: a second initialize reports the version and changes
    /// nothing.
    pub fn initialize(&self) -> (i32, i32) {
        let mut state = self.state.lock().unwrap();
        if state.initialized {
            return EGL_VERSION;
        }

        let mut raw: Vec<ConfigAttribs> = self
            .backend
            .config_enum()
            .into_iter()
            .filter(|cfg| cfg.usable_offscreen())
            .collect();
        for cfg in &mut raw {
            cfg.normalize();
        }
        raw.sort_by_key(|cfg| cfg.sort_key());

        state.configs = raw
            .into_iter()
            .map(|attribs| {
                Arc::new(EglConfig {
                    handle: self.handles.alloc(),
                    attribs,
                    backend: self.backend.clone(),
                })
            })
            .collect();
        state.initialized = true;
        EGL_VERSION
    }

    /// Empties the registries and marks the display uninitialized. Dropping
    /// happens outside the lock; destructors can take arbitrary backend
    /// paths.
    pub fn terminate(&self) {
        let dropped = {
            let mut state = self.state.lock().unwrap();
            state.initialized = false;
            (
                std::mem::take(&mut state.surfaces),
                std::mem::take(&mut state.contexts),
                std::mem::take(&mut state.configs),
            )
        };
        drop(dropped);
    }

    pub fn configs(&self) -> Vec<Arc<EglConfig>> {
        self.state.lock().unwrap().configs.clone()
    }

    pub fn config_count(&self) -> usize {
        self.state.lock().unwrap().configs.len()
    }

    /// Configs matching a parsed `eglChooseConfig` request, in registration
    /// order. An id request returns at most one entry.
    pub fn choose(&self, select: &ConfigSelect) -> Vec<Arc<EglConfig>> {
        let state = self.state.lock().unwrap();
        match select {
            ConfigSelect::ById(id) => state
                .configs
                .iter()
                .filter(|cfg| cfg.id() == *id)
                .cloned()
                .collect(),
            ConfigSelect::Criteria(c) => state
                .configs
                .iter()
                .filter(|cfg| c.matches(&cfg.attribs))
                .cloned()
                .collect(),
        }
    }

    pub fn config_by_handle(&self, handle: HostHandle) -> Option<Arc<EglConfig>> {
        let state = self.state.lock().unwrap();
        state
            .configs
            .iter()
            .find(|cfg| cfg.handle() == handle)
            .cloned()
    }

    pub(crate) fn add_surface(&self, surface: Arc<EglSurface>) {
        self.state.lock().unwrap().surfaces.push(surface);
    }

    pub fn surface_by_handle(&self, handle: HostHandle) -> Option<Arc<EglSurface>> {
        let state = self.state.lock().unwrap();
        state
            .surfaces
            .iter()
            .find(|s| s.handle() == handle)
            .cloned()
    }

    /// Unregisters a surface. A surface bound to a current context stays
    /// put; the guest must release it first.
    pub(crate) fn remove_surface(&self, handle: HostHandle) -> EglResult<()> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let idx = state
                .surfaces
                .iter()
                .position(|s| s.handle() == handle)
                .ok_or(EglError::BadSurface)?;
            if state.surfaces[idx].is_bound() {
                return Err(EglError::BadSurface);
            }
            state.surfaces.remove(idx)
        };
        drop(removed);
        Ok(())
    }

    pub(crate) fn add_context(&self, context: Arc<EglContext>) {
        self.state.lock().unwrap().contexts.push(context);
    }

    pub fn context_by_handle(&self, handle: HostHandle) -> Option<Arc<EglContext>> {
        let state = self.state.lock().unwrap();
        state
            .contexts
            .iter()
            .find(|c| c.handle() == handle)
            .cloned()
    }

    /// Unregisters a context. A current context survives through the
    /// thread state's reference until it is released.
    pub(crate) fn remove_context(&self, handle: HostHandle) -> EglResult<()> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let idx = state
                .contexts
                .iter()
                .position(|c| c.handle() == handle)
                .ok_or(EglError::BadContext)?;
            state.contexts.remove(idx)
        };
        drop(removed);
        Ok(())
    }
}
