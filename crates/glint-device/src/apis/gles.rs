//! GLES dispatcher: name management and shader bookkeeping.
//!
//! The device is authoritative for GL object names. `glGenTextures` and
//! `glCreateShader` mint names host-side and hand them back through the
//! call's result slots, so the guest name and the host name are always the
//! same value and no translation table is needed on the render path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glint_egl::{EglBackend, HandleAllocator};
use glint_protocol::GlesFunc;
use tracing::{error, warn};

use crate::api::{ApiProcess, CallCtx, DispatchError};
use crate::object_map::{MapObject, ObjectMap};
use crate::transport::TransportError;

const GL_FRAGMENT_SHADER: i32 = 0x8B30;
const GL_VERTEX_SHADER: i32 = 0x8B31;

/// A texture name minted by `glGenTextures`.
struct TextureObject {
    name: u32,
}

impl MapObject for TextureObject {
    fn global_name(&self) -> u32 {
        self.name
    }
}

/// Per-process GLES state, shared across the process's threads.
pub struct GlesApiProcess {
    backend: Arc<dyn EglBackend>,
    object_map: Arc<Mutex<ObjectMap>>,
    names: HandleAllocator,
    shaders: HashMap<u32, String>,
}

impl GlesApiProcess {
    pub fn new(backend: Arc<dyn EglBackend>, object_map: Arc<Mutex<ObjectMap>>) -> Self {
        Self {
            backend,
            object_map,
            names: HandleAllocator::new(),
            shaders: HashMap::new(),
        }
    }

    /// Stored source text of a shader, for inspection.
    pub fn shader_source_text(&self, shader: u32) -> Option<&str> {
        self.shaders.get(&shader).map(String::as_str)
    }

    fn gen_textures(&mut self, ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        let t = &mut *ctx.transport;
        let arr = t.get_in_array(4)?;
        if arr.is_null() {
            return t.put_in_array(ctx.mem, arr, &[], 0);
        }
        let n = arr.maxcount();
        let mut bytes = Vec::with_capacity(n as usize * 4);
        let mut map = self.object_map.lock().unwrap();
        for _ in 0..n {
            let name = self.names.alloc();
            map.add(name, Box::new(TextureObject { name }));
            bytes.extend_from_slice(&name.to_le_bytes());
        }
        drop(map);
        t.put_in_array(ctx.mem, arr, &bytes, n)
    }

    fn delete_textures(&mut self, ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        let names = ctx.transport.get_out_array_u32()?;
        // Releasing native objects needs a context current on this thread.
        self.backend.ensure_current();
        let mut map = self.object_map.lock().unwrap();
        for name in names {
            // Names the guest never generated are ignored, as GL does.
            if map.contains(name) {
                map.remove(name);
            }
        }
        drop(map);
        self.backend.unensure_current();
        Ok(())
    }

    fn create_shader(&mut self, ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        let t = &mut *ctx.transport;
        let shader_type = t.get_i32()?;
        let retval = t.get_in_arg()?;
        let name = match shader_type {
            GL_VERTEX_SHADER | GL_FRAGMENT_SHADER => {
                let name = self.names.alloc();
                self.shaders.insert(name, String::new());
                name
            }
            _ => {
                warn!(shader_type, "unknown shader type");
                0
            }
        };
        if let Some(slot) = retval {
            t.put_in_arg(ctx.mem, slot, name)?;
        }
        Ok(())
    }

    fn shader_source(&mut self, ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        let t = &mut *ctx.transport;
        let shader = t.get_u32()?;
        let bytes = t.get_out_array_bytes()?;
        let mut segments: Vec<&[u8]> = Vec::new();
        let mut rest = &bytes[..];
        while let Some(pos) = rest.iter().position(|b| *b == 0) {
            segments.push(&rest[..pos]);
            rest = &rest[pos + 1..];
        }
        if !rest.is_empty() {
            // Keep the strings that did arrive whole.
            error!(shader, "shader source array is not NUL terminated");
        }
        let text: String = segments
            .iter()
            .map(|s| String::from_utf8_lossy(s))
            .collect();
        match self.shaders.get_mut(&shader) {
            Some(slot) => *slot = text,
            None => warn!(shader, "source upload for unknown shader"),
        }
        Ok(())
    }

    fn delete_shader(&mut self, ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        let shader = ctx.transport.get_u32()?;
        if self.shaders.remove(&shader).is_none() {
            warn!(shader, "delete of unknown shader");
        }
        Ok(())
    }

    fn flush(&mut self, _ctx: &mut CallCtx<'_>) -> Result<(), TransportError> {
        self.backend.flush();
        Ok(())
    }
}

impl ApiProcess for GlesApiProcess {
    fn thread_init(&mut self, _tid: u32) {}

    fn thread_fini(&mut self, _tid: u32) {}

    fn batch_start(&mut self, _tid: u32) {}

    fn batch_end(&mut self, _tid: u32) {}

    fn dispatch(&mut self, func_id: u32, ctx: &mut CallCtx<'_>) -> Result<(), DispatchError> {
        let Some(func) = GlesFunc::from_u32(func_id) else {
            return Err(DispatchError::UnknownFunc(func_id));
        };
        match func {
            GlesFunc::GenTextures => self.gen_textures(ctx)?,
            GlesFunc::DeleteTextures => self.delete_textures(ctx)?,
            GlesFunc::CreateShader => self.create_shader(ctx)?,
            GlesFunc::ShaderSource => self.shader_source(ctx)?,
            GlesFunc::DeleteShader => self.delete_shader(ctx)?,
            GlesFunc::Flush => self.flush(ctx)?,
        }
        Ok(())
    }
}
