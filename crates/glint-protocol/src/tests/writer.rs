use pretty_assertions::assert_eq;

use crate::wire::{
    ApiId, EglFunc, GlesFunc, BATCH_HEADER_SIZE_BYTES, BATCH_OUT_ARRAY_COUNT_OFFSET, BATCH_SIZE_OFFSET,
};
use crate::writer::BatchWriter;

fn u32_at(buf: &[u8], offset: u32) -> u32 {
    let offset = offset as usize;
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn slot(buf: &[u8], index: u32) -> u32 {
    u32_at(buf, BATCH_HEADER_SIZE_BYTES + index * 8)
}

#[test]
fn empty_batch_is_header_only() {
    let w = BatchWriter::new();
    assert!(w.is_empty());
    let image = w.finish();
    assert_eq!(image.len(), BATCH_HEADER_SIZE_BYTES as usize);
    assert_eq!(u32_at(&image, 0), 0);
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), 0);
    assert_eq!(u32_at(&image, BATCH_OUT_ARRAY_COUNT_OFFSET), 0);
}

#[test]
fn fence_seq_lands_in_header() {
    let mut w = BatchWriter::new();
    w.set_fence_seq(77);
    let image = w.finish();
    assert_eq!(u32_at(&image, 8), 77);
}

#[test]
fn scalar_call_layout() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, EglFunc::BindApi as u32, false);
    w.put_u32(0x30A0);
    assert!(!w.is_empty());
    let image = w.finish();

    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), 4 * 8);
    assert_eq!(slot(&image, 0), ApiId::Egl as u32);
    assert_eq!(slot(&image, 1), EglFunc::BindApi as u32);
    assert_eq!(slot(&image, 2), 0);
    assert_eq!(slot(&image, 3), 0x30A0);
}

#[test]
fn inline_out_array_pads_payload_to_slot() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, GlesFunc::ShaderSource as u32, false);
    w.put_out_array(0x5000, 5, b"abcd\0");
    let image = w.finish();

    // call header, va, count, one padded payload slot
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), (3 + 2 + 1) * 8);
    assert_eq!(slot(&image, 3), 0x5000);
    assert_eq!(slot(&image, 4), 5);
    let payload = BATCH_HEADER_SIZE_BYTES as usize + 5 * 8;
    assert_eq!(&image[payload..payload + 5], b"abcd\0");
    assert_eq!(&image[payload + 5..payload + 8], &[0, 0, 0]);
}

#[test]
fn absent_arrays_still_occupy_two_slots() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, EglFunc::GetConfigs as u32, false);
    w.put_out_array_none();
    w.put_in_array_none();
    let image = w.finish();
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), (3 + 2 + 2) * 8);
    assert_eq!(slot(&image, 3), 0);
    assert_eq!(slot(&image, 4), 0);
    assert_eq!(slot(&image, 5), 0);
    assert_eq!(slot(&image, 6), 0);
}

#[test]
fn in_array_reserves_inline_space() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, GlesFunc::GenTextures as u32, false);
    w.put_in_array(0x2000, 3, 4);
    let image = w.finish();

    // 3 u32 elements is 12 bytes, padded to 16
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), (3 + 2) * 8 + 16);
    assert_eq!(slot(&image, 3), 0x2000);
    assert_eq!(slot(&image, 4), 3);
}

#[test]
fn in_arg_value_slot_only_when_present() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Egl, EglFunc::Initialize as u32, false);
    w.put_in_arg(0);
    w.put_in_arg(0x9000);
    let image = w.finish();
    // header + absent arg (1 slot) + present arg (2 slots)
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), (3 + 1 + 2) * 8);
    assert_eq!(slot(&image, 3), 0);
    assert_eq!(slot(&image, 4), 0x9000);
    assert_eq!(slot(&image, 5), 0);
}

#[test]
fn direct_out_arrays_append_descriptor_table() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, GlesFunc::ShaderSource as u32, true);
    w.put_out_array_direct(0x7000, 16, 16);
    w.put_out_array_direct(0x8000, 2, 8);
    let image = w.finish();

    // stream holds only the call header and two va/count slot pairs
    let stream = 7 * 8;
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), stream);
    assert_eq!(u32_at(&image, BATCH_OUT_ARRAY_COUNT_OFFSET), 2);
    assert_eq!(slot(&image, 2), 1);
    assert_eq!(slot(&image, 3), 0x7000);
    assert_eq!(slot(&image, 4), 16);

    let table = BATCH_HEADER_SIZE_BYTES + stream;
    assert_eq!(u32_at(&image, table), 0x7000);
    assert_eq!(u32_at(&image, table + 8), 16);
    assert_eq!(u32_at(&image, table + 16), 0x8000);
    assert_eq!(u32_at(&image, table + 24), 8);
    assert_eq!(image.len() as u32, table + 32);
}

#[test]
fn direct_in_array_has_no_inline_payload() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, GlesFunc::GenTextures as u32, true);
    w.put_in_array(0x2000, 64, 4);
    let image = w.finish();
    assert_eq!(u32_at(&image, BATCH_SIZE_OFFSET), (3 + 2) * 8);
}

#[test]
fn reset_clears_stream_and_descriptors() {
    let mut w = BatchWriter::new();
    w.begin_call(ApiId::Gles, GlesFunc::Flush as u32, true);
    w.put_out_array_direct(0x7000, 4, 4);
    w.reset();
    assert!(w.is_empty());
    let image = w.finish();
    assert_eq!(image.len(), BATCH_HEADER_SIZE_BYTES as usize);
    assert_eq!(u32_at(&image, BATCH_OUT_ARRAY_COUNT_OFFSET), 0);
}
