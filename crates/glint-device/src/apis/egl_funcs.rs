//! Demarshaling stubs for the EGL wire functions.
//!
//! Every stub follows the same shape: pull the arguments off the call
//! stream in wire order, including the slots for results, then execute,
//! then publish. EGL-level failures travel back through the call's error
//! and return slots; the only errors that escape a stub are transport
//! ones.
//!
//! Result slot conventions on this wire: scalar results come first, the
//! error code second to last, the return value last. Calls whose guest
//! wrapper cannot fail synchronously carry no result slots at all.

use std::sync::Mutex;

use glint_egl::{error_code, EglApi, EglResult, EglThread, HostHandle};
use glint_mem::SharedGuestMemory;
use tracing::warn;

use crate::api::CallCtx;
use crate::apis::egl::EglImageObject;
use crate::object_map::ObjectMap;
use crate::transport::{InArgRef, InArrayRef, Transport, TransportError};

/// Publishes the error code and an `EGLBoolean` success flag.
fn put_bool<T>(
    t: &Transport,
    mem: &SharedGuestMemory,
    res: &EglResult<T>,
    error: Option<InArgRef>,
    retval: Option<InArgRef>,
) -> Result<(), TransportError> {
    if let Some(slot) = error {
        t.put_in_arg(mem, slot, error_code(res))?;
    }
    if let Some(slot) = retval {
        t.put_in_arg(mem, slot, u32::from(res.is_ok()))?;
    }
    Ok(())
}

/// Publishes the error code and a created handle, 0 on failure.
fn put_handle(
    t: &Transport,
    mem: &SharedGuestMemory,
    res: &EglResult<HostHandle>,
    error: Option<InArgRef>,
    retval: Option<InArgRef>,
) -> Result<(), TransportError> {
    if let Some(slot) = error {
        t.put_in_arg(mem, slot, error_code(res))?;
    }
    if let Some(slot) = retval {
        t.put_in_arg(mem, slot, *res.as_ref().unwrap_or(&0))?;
    }
    Ok(())
}

/// Fills a config-list in-array. A NULL array takes the total count, the
/// size-query form of `eglGetConfigs` and `eglChooseConfig`.
fn put_config_list(
    t: &mut Transport,
    mem: &SharedGuestMemory,
    arr: InArrayRef,
    handles: &[HostHandle],
) -> Result<(), TransportError> {
    if arr.is_null() {
        return t.put_in_array(mem, arr, &[], handles.len() as u32);
    }
    let n = handles.len().min(arr.maxcount() as usize);
    let mut bytes = Vec::with_capacity(n * 4);
    for handle in &handles[..n] {
        bytes.extend_from_slice(&handle.to_le_bytes());
    }
    t.put_in_array(mem, arr, &bytes, n as u32)
}

pub(crate) fn get_display(
    api: &EglApi,
    _ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let display_id = t.get_u32()?;
    let retval = t.get_in_arg()?;
    let handle = api.get_display(display_id);
    if let Some(slot) = retval {
        t.put_in_arg(ctx.mem, slot, handle)?;
    }
    Ok(())
}

pub(crate) fn initialize(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let major = t.get_in_arg()?;
    let minor = t.get_in_arg()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.initialize(ts, dpy);
    if let Ok((maj, min)) = res {
        if let Some(slot) = major {
            t.put_in_arg(ctx.mem, slot, maj as u32)?;
        }
        if let Some(slot) = minor {
            t.put_in_arg(ctx.mem, slot, min as u32)?;
        }
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn terminate(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.terminate(ts, dpy);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn get_configs(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let configs = t.get_in_array(4)?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.get_configs(ts, dpy);
    if let Ok(handles) = &res {
        put_config_list(t, ctx.mem, configs, handles)?;
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn choose_config(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let attribs = t.get_out_array_i32()?;
    let configs = t.get_in_array(4)?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.choose_config(ts, dpy, &attribs);
    if let Ok(handles) = &res {
        put_config_list(t, ctx.mem, configs, handles)?;
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn get_config_attrib(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let attribute = t.get_i32()?;
    let value = t.get_in_arg()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.get_config_attrib(ts, dpy, cfg, attribute);
    if let (Ok(v), Some(slot)) = (&res, value) {
        t.put_in_arg(ctx.mem, slot, *v as u32)?;
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn destroy_surface(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.destroy_surface(ts, dpy, surface);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn query_surface(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let attribute = t.get_i32()?;
    let value = t.get_in_arg()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.query_surface(ts, dpy, surface, attribute);
    // A recognized attribute the surface does not track leaves the guest's
    // value untouched, still a successful query.
    if let (Ok(Some(v)), Some(slot)) = (&res, value) {
        t.put_in_arg(ctx.mem, slot, *v as u32)?;
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn bind_api(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let value = ctx.transport.get_i32()?;
    let _ = api.bind_api(ts, value);
    Ok(())
}

pub(crate) fn wait_client(
    api: &EglApi,
    ts: &mut EglThread,
    _ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let _ = api.wait_client(ts);
    Ok(())
}

pub(crate) fn release_thread(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.release_thread(ts);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn surface_attrib(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let attribute = t.get_i32()?;
    let value = t.get_i32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.surface_attrib(ts, dpy, surface, attribute, value);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_context(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let share = t.get_u32()?;
    let attribs = t.get_out_array_i32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.create_context(ts, dpy, cfg, share, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn destroy_context(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let context = t.get_u32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.destroy_context(ts, dpy, context);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn make_current(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let draw = t.get_u32()?;
    let read = t.get_u32()?;
    let context = t.get_u32()?;
    // Fire and forget on the wire; the guest wrapper reports failures from
    // the sticky error instead of stalling every bind on a round trip.
    let _ = api.make_current(ts, dpy, draw, read, context);
    Ok(())
}

pub(crate) fn query_context(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let context = t.get_u32()?;
    let attribute = t.get_i32()?;
    let value = t.get_in_arg()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.query_context(ts, dpy, context, attribute);
    if let (Ok(v), Some(slot)) = (&res, value) {
        t.put_in_arg(ctx.mem, slot, *v as u32)?;
    }
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn swap_buffers(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let _ = api.swap_buffers(ts, dpy, surface);
    Ok(())
}

pub(crate) fn copy_buffers(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let _ = api.copy_buffers(ts, dpy, surface);
    Ok(())
}

fn offscreen_surface_args(
    t: &mut Transport,
) -> Result<(u32, u32, u32, u32, u32, u64, Vec<i32>), TransportError> {
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let width = t.get_u32()?;
    let height = t.get_u32()?;
    let bpp = t.get_u32()?;
    let pixels_va = t.get_va()?;
    let attribs = t.get_out_array_i32()?;
    Ok((dpy, cfg, width, height, bpp, pixels_va, attribs))
}

pub(crate) fn create_window_surface_offscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let (dpy, cfg, width, height, bpp, pixels_va, attribs) = offscreen_surface_args(t)?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res =
        api.create_window_surface_offscreen(ts, dpy, cfg, width, height, bpp, pixels_va, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_pbuffer_surface_offscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let (dpy, cfg, width, height, bpp, pixels_va, attribs) = offscreen_surface_args(t)?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res =
        api.create_pbuffer_surface_offscreen(ts, dpy, cfg, width, height, bpp, pixels_va, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_pixmap_surface_offscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let (dpy, cfg, width, height, bpp, pixels_va, attribs) = offscreen_surface_args(t)?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res =
        api.create_pixmap_surface_offscreen(ts, dpy, cfg, width, height, bpp, pixels_va, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn resize_offscreen_surface(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let width = t.get_u32()?;
    let height = t.get_u32()?;
    let bpp = t.get_u32()?;
    let pixels_va = t.get_va()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.resize_offscreen_surface(ts, dpy, surface, width, height, bpp, pixels_va);
    put_bool(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_window_surface_onscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let winsys_id = t.get_u32()?;
    let attribs = t.get_out_array_i32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.create_window_surface_onscreen(ts, dpy, cfg, winsys_id, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_pbuffer_surface_onscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let winsys_id = t.get_u32()?;
    let attribs = t.get_out_array_i32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.create_pbuffer_surface_onscreen(ts, dpy, cfg, winsys_id, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn create_pixmap_surface_onscreen(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let cfg = t.get_u32()?;
    let winsys_id = t.get_u32()?;
    let attribs = t.get_out_array_i32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.create_pixmap_surface_onscreen(ts, dpy, cfg, winsys_id, &attribs);
    put_handle(t, ctx.mem, &res, error, retval)
}

pub(crate) fn invalidate_onscreen_surface(
    api: &EglApi,
    ts: &mut EglThread,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let dpy = t.get_u32()?;
    let surface = t.get_u32()?;
    let buffer = t.get_u32()?;
    let _ = api.invalidate_onscreen_surface(ts, dpy, surface, buffer);
    Ok(())
}

pub(crate) fn create_image(
    api: &EglApi,
    ts: &mut EglThread,
    map: &Mutex<ObjectMap>,
    ctx: &mut CallCtx<'_>,
) -> Result<(), TransportError> {
    let t = &mut *ctx.transport;
    let texture = t.get_u32()?;
    let dpy = t.get_u32()?;
    let buffer = t.get_u32()?;
    let error = t.get_in_arg()?;
    let retval = t.get_in_arg()?;
    let res = api.create_image(ts, dpy, buffer);
    let code = error_code(&res);
    let ok = res.is_ok();
    if let Ok(image) = res {
        let mut map = map.lock().unwrap();
        if map.contains(texture) {
            warn!(texture, "texture already sources an image, replacing");
            map.remove(texture);
        }
        map.add(texture, Box::new(EglImageObject::new(buffer, image)));
    }
    if let Some(slot) = error {
        t.put_in_arg(ctx.mem, slot, code)?;
    }
    if let Some(slot) = retval {
        t.put_in_arg(ctx.mem, slot, u32::from(ok))?;
    }
    Ok(())
}
