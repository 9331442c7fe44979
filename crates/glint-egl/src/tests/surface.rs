use pretty_assertions::assert_eq;

use glint_mem::GuestMemory;

use crate::attribs::*;
use crate::error::EglError;
use crate::mock::pattern_byte;
use crate::tests::initialized;

#[test]
fn pbuffer_queries_cover_the_static_attributes() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_pbuffer_surface_offscreen(
            &mut ts,
            dpy,
            cfg,
            64,
            48,
            4,
            0x1000,
            &[EGL_TEXTURE_FORMAT, EGL_TEXTURE_RGBA, EGL_NONE],
        )
        .unwrap();

    let q = |ts: &mut _, attr| api.query_surface(ts, dpy, sfc, attr).unwrap();
    assert_eq!(q(&mut ts, EGL_WIDTH), Some(64));
    assert_eq!(q(&mut ts, EGL_HEIGHT), Some(48));
    assert_eq!(
        q(&mut ts, EGL_CONFIG_ID),
        Some(api.get_config_attrib(&mut ts, dpy, cfg, EGL_CONFIG_ID).unwrap())
    );
    assert_eq!(q(&mut ts, EGL_RENDER_BUFFER), Some(EGL_BACK_BUFFER));
    assert_eq!(q(&mut ts, EGL_SWAP_BEHAVIOR), Some(EGL_BUFFER_PRESERVED));
    assert_eq!(q(&mut ts, EGL_TEXTURE_FORMAT), Some(EGL_TEXTURE_RGBA));
    assert_eq!(q(&mut ts, EGL_TEXTURE_TARGET), Some(EGL_NO_TEXTURE));
    assert_eq!(q(&mut ts, EGL_LARGEST_PBUFFER), Some(EGL_FALSE));
    assert_eq!(q(&mut ts, EGL_MIPMAP_LEVEL), Some(0));
    assert_eq!(q(&mut ts, EGL_HORIZONTAL_RESOLUTION), Some(EGL_UNKNOWN));
    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, 0x7777).unwrap_err(),
        EglError::BadAttribute
    );
}

#[test]
fn pbuffer_attributes_stay_off_other_kinds() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_window_surface_offscreen(&mut ts, dpy, cfg, 32, 32, 4, 0x1000, &[])
        .unwrap();

    // Recognized, but nothing is written back for a window.
    assert_eq!(api.query_surface(&mut ts, dpy, sfc, EGL_TEXTURE_FORMAT).unwrap(), None);
    assert_eq!(api.query_surface(&mut ts, dpy, sfc, EGL_LARGEST_PBUFFER).unwrap(), None);
    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, EGL_RENDER_BUFFER).unwrap(),
        Some(EGL_BACK_BUFFER)
    );
}

#[test]
fn window_attrib_list_is_checked_before_the_display() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];

    assert_eq!(
        api.create_window_surface_offscreen(
            &mut ts,
            0xdead,
            0,
            32,
            32,
            4,
            0x1000,
            &[EGL_TEXTURE_FORMAT, EGL_TEXTURE_RGBA, EGL_NONE],
        )
        .unwrap_err(),
        EglError::BadAttribute
    );

    // EGL_RENDER_BUFFER is the one attribute a window create accepts.
    assert!(api
        .create_window_surface_offscreen(
            &mut ts,
            dpy,
            cfg,
            32,
            32,
            4,
            0x1000,
            &[EGL_RENDER_BUFFER, EGL_BACK_BUFFER, EGL_NONE],
        )
        .is_ok());
}

#[test]
fn pixmap_takes_no_attributes() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];

    assert_eq!(
        api.create_pixmap_surface_offscreen(
            &mut ts,
            dpy,
            cfg,
            32,
            32,
            4,
            0x1000,
            &[EGL_RENDER_BUFFER, EGL_BACK_BUFFER, EGL_NONE],
        )
        .unwrap_err(),
        EglError::BadAttribute
    );

    let sfc = api
        .create_pixmap_surface_offscreen(&mut ts, dpy, cfg, 32, 32, 4, 0x1000, &[EGL_NONE])
        .unwrap();
    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, EGL_RENDER_BUFFER).unwrap(),
        Some(EGL_SINGLE_BUFFER)
    );
}

#[test]
fn pbuffer_attrib_values_are_validated() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];

    assert_eq!(
        api.create_pbuffer_surface_offscreen(
            &mut ts,
            dpy,
            cfg,
            8,
            8,
            4,
            0x1000,
            &[EGL_TEXTURE_FORMAT, 0x1234, EGL_NONE],
        )
        .unwrap_err(),
        EglError::BadAttribute
    );

    // Width and height tokens ride along in guest lists; the dimensions
    // themselves arrive as call arguments.
    assert!(api
        .create_pbuffer_surface_offscreen(
            &mut ts,
            dpy,
            cfg,
            8,
            8,
            4,
            0x1000,
            &[EGL_WIDTH, 8, EGL_HEIGHT, 8, EGL_NONE],
        )
        .is_ok());
}

#[test]
fn create_failure_maps_to_the_kind_error() {
    let (driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];

    driver.fail_next_pbuffer_create();
    assert_eq!(
        api.create_window_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
            .unwrap_err(),
        EglError::BadNativeWindow
    );
    driver.fail_next_pbuffer_create();
    assert_eq!(
        api.create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
            .unwrap_err(),
        EglError::BadAlloc
    );
    driver.fail_next_pbuffer_create();
    assert_eq!(
        api.create_pixmap_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
            .unwrap_err(),
        EglError::BadNativePixmap
    );
}

#[test]
fn unmapped_pixel_buffer_rejects_the_create() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    // Guest memory is 1 MiB; this target is far outside it.
    assert_eq!(
        api.create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0xdead_0000, &[])
            .unwrap_err(),
        EglError::BadAlloc
    );
}

#[test]
fn destroy_rejects_unknown_handles() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    assert_eq!(
        api.destroy_surface(&mut ts, dpy, 0xbeef).unwrap_err(),
        EglError::BadSurface
    );
}

#[test]
fn destroy_releases_the_native_surface() {
    let (driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
        .unwrap();
    assert_eq!(driver.live_surfaces(), 2);
    api.destroy_surface(&mut ts, dpy, sfc).unwrap();
    assert_eq!(driver.live_surfaces(), 1);
    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, EGL_WIDTH).unwrap_err(),
        EglError::BadSurface
    );
}

#[test]
fn surface_attrib_accepts_the_mutable_tokens() {
    let (_driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
        .unwrap();

    api.surface_attrib(&mut ts, dpy, sfc, EGL_SWAP_BEHAVIOR, EGL_BUFFER_DESTROYED)
        .unwrap();
    api.surface_attrib(&mut ts, dpy, sfc, EGL_MIPMAP_LEVEL, 1)
        .unwrap();
    assert_eq!(
        api.surface_attrib(&mut ts, dpy, sfc, EGL_WIDTH, 16).unwrap_err(),
        EglError::BadAttribute
    );
}

#[test]
fn swap_copies_flipped_rows_into_guest_memory() {
    let (_driver, mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let (width, height, bpp) = (4u32, 3u32, 4u32);
    let va = 0x2000u64;

    let sfc = api
        .create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, width, height, bpp, va, &[])
        .unwrap();
    let ctx = api.create_context(&mut ts, dpy, cfg, 0, &[]).unwrap();
    api.make_current(&mut ts, dpy, sfc, sfc, ctx).unwrap();
    api.swap_buffers(&mut ts, dpy, sfc).unwrap();

    // The mock mints native ids in order: four for the backend's private
    // ensure objects, one for the display, so this pbuffer is id 6. Its
    // readback is the id-seeded pattern in bottom-up row order.
    let seed = 6u64;
    let line = (width * bpp) as usize;
    let mut got = vec![0u8; line * height as usize];
    mem.lock().unwrap().read(va, &mut got).unwrap();
    for row in 0..height as usize {
        for col in 0..line {
            let src = (height as usize - 1 - row) * line + col;
            assert_eq!(got[row * line + col], pattern_byte(seed, src));
        }
    }

    api.make_current(&mut ts, dpy, 0, 0, 0).unwrap();
}

#[test]
fn resize_swaps_the_backing_target_in_place() {
    let (driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
        .unwrap();

    // Resizing rebinds the current context over the new target, so a
    // thread without one is refused.
    assert_eq!(
        api.resize_offscreen_surface(&mut ts, dpy, sfc, 16, 16, 4, 0x3000)
            .unwrap_err(),
        EglError::BadContext
    );

    let ctx = api.create_context(&mut ts, dpy, cfg, 0, &[]).unwrap();
    api.make_current(&mut ts, dpy, sfc, sfc, ctx).unwrap();
    api.resize_offscreen_surface(&mut ts, dpy, sfc, 16, 16, 4, 0x3000)
        .unwrap();

    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, EGL_WIDTH).unwrap(),
        Some(16)
    );
    // The old native target is gone; the new one and the ensure pbuffer
    // remain.
    assert_eq!(driver.live_surfaces(), 2);

    api.make_current(&mut ts, dpy, 0, 0, 0).unwrap();
}

#[test]
fn resize_failure_keeps_the_old_target() {
    let (driver, _mem, api, mut ts, dpy) = initialized();
    let cfg = api.get_configs(&mut ts, dpy).unwrap()[0];
    let sfc = api
        .create_pbuffer_surface_offscreen(&mut ts, dpy, cfg, 8, 8, 4, 0x1000, &[])
        .unwrap();
    let ctx = api.create_context(&mut ts, dpy, cfg, 0, &[]).unwrap();
    api.make_current(&mut ts, dpy, sfc, sfc, ctx).unwrap();

    driver.fail_next_pbuffer_create();
    assert_eq!(
        api.resize_offscreen_surface(&mut ts, dpy, sfc, 16, 16, 4, 0x3000)
            .unwrap_err(),
        EglError::BadAlloc
    );
    assert_eq!(
        api.query_surface(&mut ts, dpy, sfc, EGL_WIDTH).unwrap(),
        Some(8)
    );

    api.make_current(&mut ts, dpy, 0, 0, 0).unwrap();
}
