use pretty_assertions::assert_eq;

use glint_egl::attribs::EGL_NONE;
use glint_protocol::{ApiId, BatchWriter, EglFunc, GLINT_PROTOCOL_VERSION};

use crate::process::BatchOutcome;
use crate::tests::{
    egl_bootstrap, egl_first_config, load_image, next_value_slot, offscreen_server, read_u32_at,
    reload_image, shared_mem, BUF,
};

const PID: u32 = 51;
const TID_A: u32 = 11;
const TID_B: u32 = 12;

#[test]
fn version_mismatch_is_rejected() {
    let mem = shared_mem(0x10_0000);
    let (_driver, server) = offscreen_server(&mem);
    assert!(!server.dispatch_init(GLINT_PROTOCOL_VERSION + 1, PID, TID_A));
    assert_eq!(server.process_count(), 0);
}

#[test]
fn duplicate_thread_attach_is_rejected() {
    let mem = shared_mem(0x10_0000);
    let (_driver, server) = offscreen_server(&mem);
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    assert!(!server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    assert_eq!(server.process_count(), 1);
    let threads = server.with_process(PID, |p| p.thread_count());
    assert_eq!(threads, Some(1));
}

#[test]
fn process_lives_until_its_last_thread_detaches() {
    let mem = shared_mem(0x10_0000);
    let (_driver, server) = offscreen_server(&mem);
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_B));
    assert_eq!(server.process_count(), 1);
    assert_eq!(server.with_process(PID, |p| p.thread_count()), Some(2));

    server.dispatch_exit(PID, TID_A);
    assert_eq!(server.process_count(), 1);
    assert_eq!(server.with_process(PID, |p| p.thread_count()), Some(1));

    server.dispatch_exit(PID, TID_B);
    assert_eq!(server.process_count(), 0);
    assert_eq!(server.with_process(PID, |p| p.thread_count()), None);
}

#[test]
fn stray_detaches_are_harmless() {
    let mem = shared_mem(0x10_0000);
    let (_driver, server) = offscreen_server(&mem);
    server.dispatch_exit(99, 1);
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    // A tid the process never attached does not tear anything down.
    server.dispatch_exit(PID, TID_B);
    assert_eq!(server.process_count(), 1);
    assert_eq!(server.with_process(PID, |p| p.thread_count()), Some(1));
}

#[test]
fn distinct_pids_are_distinct_processes() {
    let mem = shared_mem(0x10_0000);
    let (_driver, server) = offscreen_server(&mem);
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID + 1, TID_A));
    assert_eq!(server.process_count(), 2);
    server.reset();
    assert_eq!(server.process_count(), 0);
}

#[test]
fn teardown_releases_native_objects() {
    let mem = shared_mem(0x10_0000);
    let (driver, server) = offscreen_server(&mem);
    assert!(server.dispatch_init(GLINT_PROTOCOL_VERSION, PID, TID_A));
    let mut t = load_image(&mem, &[]);
    let dpy = egl_bootstrap(&server, &mem, &mut t, PID, TID_A);
    let cfg = egl_first_config(&server, &mem, &mut t, PID, TID_A, dpy);
    let base_surfaces = driver.live_surfaces();
    let base_contexts = driver.live_contexts();

    let mut w = BatchWriter::new();
    w.set_fence_seq(4);
    w.begin_call(ApiId::Egl, EglFunc::CreatePbufferSurfaceOffscreen as u32, false);
    w.put_u32(dpy);
    w.put_u32(cfg);
    w.put_u32(64);
    w.put_u32(64);
    w.put_u32(4);
    w.put_u32(0x2_0000);
    w.put_out_array(0x200, 1, &EGL_NONE.to_le_bytes());
    w.put_in_arg(0);
    let sfc_slot = next_value_slot(&w);
    w.put_in_arg(0x300);
    w.begin_call(ApiId::Egl, EglFunc::CreateContext as u32, false);
    w.put_u32(dpy);
    w.put_u32(cfg);
    w.put_u32(0);
    w.put_out_array(0x210, 1, &EGL_NONE.to_le_bytes());
    w.put_in_arg(0);
    let ctx_slot = next_value_slot(&w);
    w.put_in_arg(0x304);
    reload_image(&mem, &w.finish());
    let outcome = server.run_batch(PID, TID_A, &mem, &mut t);
    assert_eq!(outcome, BatchOutcome::Completed { fence_seq: 4, calls: 2 });
    let sfc = read_u32_at(&mem, BUF + u64::from(sfc_slot));
    let ctx = read_u32_at(&mem, BUF + u64::from(ctx_slot));
    assert_ne!(sfc, 0);
    assert_ne!(ctx, 0);
    assert_eq!(driver.live_surfaces(), base_surfaces + 1);
    assert_eq!(driver.live_contexts(), base_contexts + 1);

    let mut w = BatchWriter::new();
    w.set_fence_seq(5);
    w.begin_call(ApiId::Egl, EglFunc::MakeCurrent as u32, false);
    w.put_u32(dpy);
    w.put_u32(sfc);
    w.put_u32(sfc);
    w.put_u32(ctx);
    reload_image(&mem, &w.finish());
    let outcome = server.run_batch(PID, TID_A, &mem, &mut t);
    assert_eq!(outcome, BatchOutcome::Completed { fence_seq: 5, calls: 1 });

    // Detaching the last thread destroys the process and everything the
    // guest leaked, with its context still current.
    server.dispatch_exit(PID, TID_A);
    assert_eq!(server.process_count(), 0);
    assert_eq!(driver.live_surfaces(), base_surfaces);
    assert_eq!(driver.live_contexts(), base_contexts);
}
