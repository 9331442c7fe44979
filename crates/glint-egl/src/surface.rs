//! Guest-visible EGL surfaces.
//!
//! A surface pairs a config with a backend rendering target. The three
//! kinds only differ in how they were created and which attributes apply;
//! under the offscreen backend all three draw into pbuffers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::attribs::*;
use crate::backend::BackendSurface;
use crate::display::EglConfig;
use crate::driver::NativeSurface;
use crate::error::{EglError, EglResult};
use crate::handle::HostHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Window,
    Pbuffer,
    Pixmap,
}

/// Pbuffer creation attributes, parsed from the guest attribute list.
/// Defaults are the EGL 1.4 ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbufferAttribs {
    pub largest: i32,
    pub tex_format: i32,
    pub tex_target: i32,
    pub tex_mipmap: i32,
}

impl Default for PbufferAttribs {
    fn default() -> Self {
        Self {
            largest: EGL_FALSE,
            tex_format: EGL_NO_TEXTURE,
            tex_target: EGL_NO_TEXTURE,
            tex_mipmap: EGL_FALSE,
        }
    }
}

impl PbufferAttribs {
    /// Validating parser. `EGL_WIDTH`/`EGL_HEIGHT` are legal in the list
    /// but carry no information here; dimensions arrive as explicit call
    /// arguments.
    pub fn parse(list: &[i32]) -> EglResult<Self> {
        let mut a = Self::default();
        for (token, value) in attrib_pairs(list) {
            match token {
                EGL_WIDTH | EGL_HEIGHT => {}
                EGL_LARGEST_PBUFFER => a.largest = value,
                EGL_MIPMAP_TEXTURE => a.tex_mipmap = value,
                EGL_TEXTURE_FORMAT => {
                    if value != EGL_NO_TEXTURE
                        && value != EGL_TEXTURE_RGB
                        && value != EGL_TEXTURE_RGBA
                    {
                        return Err(EglError::BadAttribute);
                    }
                    a.tex_format = value;
                }
                EGL_TEXTURE_TARGET => {
                    if value != EGL_NO_TEXTURE && value != EGL_TEXTURE_2D {
                        return Err(EglError::BadAttribute);
                    }
                    a.tex_target = value;
                }
                _ => return Err(EglError::BadAttribute),
            }
        }
        Ok(a)
    }
}

/// The only window-surface attribute EGL 1.4 defines is
/// `EGL_RENDER_BUFFER`, and back-buffer rendering is all the backends do,
/// so the value is not kept.
pub fn validate_window_attribs(list: &[i32]) -> EglResult<()> {
    for (token, _) in attrib_pairs(list) {
        if token != EGL_RENDER_BUFFER {
            return Err(EglError::BadAttribute);
        }
    }
    Ok(())
}

/// Pixmap surfaces take no attributes at all.
pub fn validate_pixmap_attribs(list: &[i32]) -> EglResult<()> {
    if attrib_pairs(list).next().is_some() {
        return Err(EglError::BadAttribute);
    }
    Ok(())
}

pub struct EglSurface {
    handle: HostHandle,
    config: Arc<EglConfig>,
    kind: SurfaceKind,
    pbuffer: PbufferAttribs,
    backend: Mutex<Box<dyn BackendSurface>>,
    /// Number of current-context bindings (draw and read count separately).
    /// A surface with a nonzero count refuses destruction.
    binds: AtomicU32,
}

impl EglSurface {
    pub(crate) fn new(
        handle: HostHandle,
        config: Arc<EglConfig>,
        kind: SurfaceKind,
        pbuffer: PbufferAttribs,
        backend: Box<dyn BackendSurface>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handle,
            config,
            kind,
            pbuffer,
            backend: Mutex::new(backend),
            binds: AtomicU32::new(0),
        })
    }

    pub fn handle(&self) -> HostHandle {
        self.handle
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn config(&self) -> &Arc<EglConfig> {
        &self.config
    }

    pub(crate) fn native(&self) -> NativeSurface {
        self.backend.lock().unwrap().native()
    }

    pub fn is_bound(&self) -> bool {
        self.binds.load(Ordering::SeqCst) != 0
    }

    pub(crate) fn bind(&self) {
        self.binds.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn unbind(&self) {
        let prev = self.binds.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev != 0, "surface bind count underflow");
    }

    /// `eglQuerySurface`. `Ok(None)` means the attribute is recognized but
    /// nothing is written back, which is how pbuffer-only attributes behave
    /// on other surface kinds.
    pub fn query(&self, attribute: i32) -> EglResult<Option<i32>> {
        let v = match attribute {
            EGL_CONFIG_ID => self.config.id(),
            EGL_LARGEST_PBUFFER => return Ok(self.pbuffer_only(self.pbuffer.largest)),
            EGL_TEXTURE_FORMAT => return Ok(self.pbuffer_only(self.pbuffer.tex_format)),
            EGL_TEXTURE_TARGET => return Ok(self.pbuffer_only(self.pbuffer.tex_target)),
            EGL_MIPMAP_TEXTURE => return Ok(self.pbuffer_only(self.pbuffer.tex_mipmap)),
            EGL_MIPMAP_LEVEL => return Ok(self.pbuffer_only(0)),
            EGL_RENDER_BUFFER => match self.kind {
                SurfaceKind::Window | SurfaceKind::Pbuffer => EGL_BACK_BUFFER,
                SurfaceKind::Pixmap => EGL_SINGLE_BUFFER,
            },
            EGL_HORIZONTAL_RESOLUTION | EGL_VERTICAL_RESOLUTION | EGL_PIXEL_ASPECT_RATIO => {
                EGL_UNKNOWN
            }
            EGL_SWAP_BEHAVIOR => EGL_BUFFER_PRESERVED,
            EGL_MULTISAMPLE_RESOLVE => EGL_MULTISAMPLE_RESOLVE_DEFAULT,
            _ => {
                return match self.backend.lock().unwrap().query(attribute) {
                    Some(v) => Ok(Some(v)),
                    None => Err(EglError::BadAttribute),
                }
            }
        };
        Ok(Some(v))
    }

    fn pbuffer_only(&self, v: i32) -> Option<i32> {
        if self.kind == SurfaceKind::Pbuffer {
            Some(v)
        } else {
            None
        }
    }

    /// `eglSurfaceAttrib`. The mutable attributes have no effect on how
    /// the backends render, so a recognized token is accepted and dropped.
    pub fn set_attrib(&self, attribute: i32, value: i32) -> EglResult<()> {
        let _ = value;
        match attribute {
            EGL_MIPMAP_LEVEL | EGL_MULTISAMPLE_RESOLVE | EGL_SWAP_BEHAVIOR => Ok(()),
            _ => Err(EglError::BadAttribute),
        }
    }

    pub(crate) fn swap_buffers(&self) -> bool {
        self.backend.lock().unwrap().swap_buffers()
    }

    pub(crate) fn copy_buffers(&self) -> bool {
        self.backend.lock().unwrap().copy_buffers()
    }

    pub(crate) fn wait_gl(&self) {
        self.backend.lock().unwrap().wait_gl();
    }

    pub(crate) fn invalidate(&self, winsys_id: u32) {
        self.backend.lock().unwrap().invalidate(winsys_id);
    }

    /// Swaps in a freshly created backend target, destroying the old one.
    /// Resize works this way: the guest-visible surface object and handle
    /// survive, only the backing storage changes.
    pub(crate) fn replace_backend(&self, backend: Box<dyn BackendSurface>) {
        *self.backend.lock().unwrap() = backend;
    }
}
