use pretty_assertions::assert_eq;

use glint_protocol::{ApiId, BatchStatus, BatchWriter};

use crate::tests::{
    faulting_mem, le_words, load_image, next_count_slot, next_payload_off, next_value_slot,
    read_bytes_at, read_u32_at, shared_mem, write_bytes_at, BUF,
};
use crate::transport::{CallHeader, TransportError};

#[test]
fn scalars_and_in_args_round_trip() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.set_fence_seq(7);
    w.begin_call(ApiId::Egl, 6, false);
    w.put_u32(11);
    w.put_i32(-3);
    w.put_f32(2.5);
    let value_slot = next_value_slot(&w);
    w.put_in_arg(0x99);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    let header = t.begin(&mem).unwrap().unwrap();
    assert_eq!(header.fence_seq, 7);
    assert_eq!(header.out_array_count, 0);

    let call = t.begin_call().unwrap().unwrap();
    assert_eq!(
        call,
        CallHeader {
            api_id: ApiId::Egl as u32,
            func_id: 6,
            direct: false,
        }
    );
    assert_eq!(t.get_u32().unwrap(), 11);
    assert_eq!(t.get_i32().unwrap(), -3);
    assert_eq!(t.get_f32().unwrap(), 2.5);
    let arg = t.get_in_arg().unwrap().unwrap();
    t.put_in_arg(&mem, arg, 0xCAFE).unwrap();

    assert!(t.begin_call().unwrap().is_none());
    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
    assert_eq!(read_u32_at(&mem, BUF + u64::from(value_slot)), 0xCAFE);
    assert_eq!(read_u32_at(&mem, BUF), BatchStatus::Ok as u32);
}

#[test]
fn empty_batch_completes() {
    let mem = shared_mem(0x10_0000);
    let image = BatchWriter::new().finish();
    let mut t = load_image(&mem, &image);
    let header = t.begin(&mem).unwrap().unwrap();
    assert_eq!(header.batch_size, 0);
    assert!(t.begin_call().unwrap().is_none());
    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
    assert_eq!(read_u32_at(&mem, BUF), BatchStatus::Ok as u32);
}

#[test]
fn absent_arguments_keep_their_slots() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, 4, false);
    w.put_u32(0xAB);
    w.put_out_array_none();
    let count_slot = next_count_slot(&w);
    w.put_in_array_none();
    w.put_in_arg(0);
    w.put_u32(0xCD);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    assert_eq!(t.get_u32().unwrap(), 0xAB);
    assert_eq!(t.get_out_array_bytes().unwrap(), Vec::<u8>::new());
    let arr = t.get_in_array(4).unwrap();
    assert!(arr.is_null());
    assert_eq!(arr.maxcount(), 0);
    assert!(t.get_in_arg().unwrap().is_none());
    assert_eq!(t.get_u32().unwrap(), 0xCD);

    // A NULL array still reports its total through the count slot.
    t.put_in_array(&mem, arr, &[], 9).unwrap();
    assert_eq!(read_u32_at(&mem, BUF + u64::from(count_slot)), 9);
}

#[test]
fn inline_out_arrays_read_back() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 4, false);
    w.put_out_array(0x9000, 3, &[1, 2, 3]);
    w.put_out_array(0x9100, 2, &le_words(&[0xDEAD, 0xBEEF]));
    w.put_u32(0x55);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    assert_eq!(t.get_out_array_bytes().unwrap(), vec![1, 2, 3]);
    assert_eq!(t.get_out_array_u32().unwrap(), vec![0xDEAD, 0xBEEF]);
    // Payload padding does not shift later arguments.
    assert_eq!(t.get_u32().unwrap(), 0x55);
}

#[test]
fn inline_in_array_fills_the_reservation() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, 4, false);
    let count_slot = next_count_slot(&w);
    let payload_off = next_payload_off(&w);
    w.put_in_array(0x9000, 4, 4);
    w.put_u32(0x77);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    let arr = t.get_in_array(4).unwrap();
    assert!(!arr.is_null());
    assert_eq!(arr.maxcount(), 4);
    assert_eq!(t.get_u32().unwrap(), 0x77);

    // Count and payload land in the buffer before the batch ends.
    t.put_in_array(&mem, arr, &le_words(&[10, 20, 30]), 3).unwrap();
    assert_eq!(read_u32_at(&mem, BUF + u64::from(count_slot)), 3);
    assert_eq!(
        read_bytes_at(&mem, BUF + u64::from(payload_off), 12),
        le_words(&[10, 20, 30])
    );

    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
}

#[test]
fn direct_out_array_prefetches_from_guest_memory() {
    let mem = shared_mem(0x10_0000);
    write_bytes_at(&mem, 0x6000, &le_words(&[5, 6, 7]));
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 2, true);
    w.put_out_array_direct(0x6000, 3, 12);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    let header = t.begin(&mem).unwrap().unwrap();
    assert_eq!(header.out_array_count, 1);
    let call = t.begin_call().unwrap().unwrap();
    assert!(call.direct);
    assert_eq!(t.get_out_array_u32().unwrap(), vec![5, 6, 7]);
    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
}

#[test]
fn direct_in_array_lands_at_batch_end() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 1, true);
    let count_slot = next_count_slot(&w);
    w.put_in_array(0x6100, 4, 4);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    let arr = t.get_in_array(4).unwrap();
    t.put_in_array(&mem, arr, &le_words(&[0xAA, 0xBB]), 2).unwrap();

    // The count is visible immediately, the payload only after the batch
    // retires.
    assert_eq!(read_u32_at(&mem, BUF + u64::from(count_slot)), 2);
    assert_eq!(read_bytes_at(&mem, 0x6100, 8), vec![0u8; 8]);

    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
    assert_eq!(read_bytes_at(&mem, 0x6100, 8), le_words(&[0xAA, 0xBB]));
}

#[test]
fn prefetch_fault_requests_a_retry() {
    let (typed, mem) = faulting_mem(0x10_0000);
    write_bytes_at(&mem, 0x6000, &le_words(&[5, 6, 7]));
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 2, true);
    w.put_out_array_direct(0x6000, 3, 12);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    typed.lock().unwrap().fail_range(0x6000, 16);
    assert!(t.begin(&mem).unwrap().is_none());
    assert_eq!(read_u32_at(&mem, BUF), BatchStatus::Retry as u32);

    // Resubmission after the fault clears parses normally.
    typed.lock().unwrap().clear_fault();
    let header = t.begin(&mem).unwrap().unwrap();
    assert_eq!(header.out_array_count, 1);
}

#[test]
fn write_back_fault_requests_a_retry() {
    let (typed, mem) = faulting_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 1, true);
    w.put_in_array(0x6100, 2, 4);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    let arr = t.get_in_array(4).unwrap();
    t.put_in_array(&mem, arr, &le_words(&[1, 2]), 2).unwrap();

    typed.lock().unwrap().fail_range(0x6100, 8);
    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Retry);
    assert_eq!(read_u32_at(&mem, BUF), BatchStatus::Retry as u32);

    // The guest resubmits the whole batch; the queued write-back from the
    // first attempt must not double up.
    typed.lock().unwrap().clear_fault();
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    let arr = t.get_in_array(4).unwrap();
    t.put_in_array(&mem, arr, &le_words(&[1, 2]), 2).unwrap();
    assert_eq!(t.end(&mem).unwrap(), BatchStatus::Ok);
    assert_eq!(read_bytes_at(&mem, 0x6100, 8), le_words(&[1, 2]));
}

#[test]
fn oversized_batch_is_an_error() {
    let mem = shared_mem(0x10_0000);
    let mut image = vec![0u8; 32];
    image[16..20].copy_from_slice(&0x8000u32.to_le_bytes());
    let mut t = load_image(&mem, &image);
    assert!(matches!(
        t.begin(&mem),
        Err(TransportError::Truncated { .. })
    ));
}

#[test]
fn partial_call_header_is_an_error() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, 1, false);
    let mut image = w.finish();
    // Lop off one slot so the call header cannot complete.
    image.truncate(image.len() - 8);
    image[16..20].copy_from_slice(&16u32.to_le_bytes());

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    assert!(matches!(
        t.begin_call(),
        Err(TransportError::Truncated { .. })
    ));
}

#[test]
fn argument_overrun_is_an_error() {
    let mem = shared_mem(0x10_0000);
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, 1, false);
    w.put_u32(1);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    assert_eq!(t.get_u32().unwrap(), 1);
    assert!(matches!(
        t.get_u32(),
        Err(TransportError::Truncated { .. })
    ));
}

#[test]
fn descriptor_mismatch_is_an_error() {
    let mem = shared_mem(0x10_0000);
    write_bytes_at(&mem, 0x6000, &le_words(&[5, 6]));
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, 2, true);
    // Descriptor says 8 bytes, the call record claims 3 elements of 4.
    w.put_out_array_direct(0x6000, 3, 8);
    let image = w.finish();

    let mut t = load_image(&mem, &image);
    t.begin(&mem).unwrap().unwrap();
    t.begin_call().unwrap().unwrap();
    assert!(matches!(
        t.get_out_array_u32(),
        Err(TransportError::BadDescriptor { index: 0 })
    ));
}
