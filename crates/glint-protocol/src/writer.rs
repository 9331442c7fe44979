//! Batch image builder.
//!
//! Emits the exact byte layout the device parses (32-byte batch header,
//! 8-byte call slots, inline array payloads, trailing out-array descriptor
//! table). Intended for tests and host-side tooling; the real guest driver
//! builds these images on the target side.

use crate::wire::{
    ApiId, BATCH_FENCE_SEQ_OFFSET, BATCH_HEADER_SIZE_BYTES, BATCH_OUT_ARRAY_COUNT_OFFSET, BATCH_SIZE_OFFSET,
    SLOT_BYTES,
};

fn align_up(v: usize, a: usize) -> usize {
    debug_assert!(a.is_power_of_two());
    (v + (a - 1)) & !(a - 1)
}

/// Builder for a single batch image.
///
/// The image starts with the 32-byte batch header (status slot zeroed; the
/// device overwrites it), followed by the call stream, followed by one
/// `(va, size)` descriptor pair per direct out-array. `finish` patches the
/// stream size and descriptor count into the header.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    buf: Vec<u8>,
    out_descs: Vec<(u32, u32)>,
    direct: bool,
}

impl BatchWriter {
    pub fn new() -> Self {
        let mut w = Self {
            buf: Vec::new(),
            out_descs: Vec::new(),
            direct: false,
        };
        w.reset();
        w
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.buf.resize(BATCH_HEADER_SIZE_BYTES as usize, 0);
        self.out_descs.clear();
        self.direct = false;
    }

    /// Patches the header and appends the direct out-array descriptor table.
    ///
    /// The returned image is what the guest driver would place at the batch
    /// buffer address before ringing the doorbell.
    pub fn finish(mut self) -> Vec<u8> {
        let stream_bytes = self.buf.len() - BATCH_HEADER_SIZE_BYTES as usize;
        assert!(stream_bytes <= u32::MAX as usize, "batch stream too large for u32 size");
        self.write_u32_at(BATCH_SIZE_OFFSET, stream_bytes as u32);
        self.write_u32_at(BATCH_OUT_ARRAY_COUNT_OFFSET, self.out_descs.len() as u32);
        let descs = std::mem::take(&mut self.out_descs);
        for (va, size) in descs {
            self.push_slot(va);
            self.push_slot(size);
        }
        self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= BATCH_HEADER_SIZE_BYTES as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn set_fence_seq(&mut self, seq: u32) {
        self.write_u32_at(BATCH_FENCE_SEQ_OFFSET, seq);
    }

    /// Starts a call record: api id, function id, direct flag.
    ///
    /// Calls have no terminator; the device reads records back to back until
    /// the stream size from the header is consumed.
    pub fn begin_call(&mut self, api: ApiId, func_id: u32, direct: bool) {
        self.push_slot(api as u32);
        self.push_slot(func_id);
        self.push_slot(direct as u32);
        self.direct = direct;
    }

    /// One scalar argument (u32 in the low bytes of an 8-byte slot).
    pub fn put_u32(&mut self, v: u32) {
        self.push_slot(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.push_slot(v as u32);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.push_slot(v.to_bits());
    }

    /// Guest-to-host array with the payload carried inline in the stream.
    ///
    /// Only valid inside a non-direct call; direct calls carry out-array
    /// payloads in guest memory and describe them with `put_out_array_direct`.
    pub fn put_out_array(&mut self, va: u32, count: u32, payload: &[u8]) {
        assert!(!self.direct, "inline out-array in a direct call");
        assert_ne!(va, 0, "inline out-array needs a nonzero address");
        self.push_slot(va);
        self.push_slot(count);
        self.push_bytes_padded(payload);
    }

    /// Guest-to-host array whose payload stays in guest memory at `va`.
    ///
    /// Appends a `(va, size_bytes)` pair to the trailing descriptor table;
    /// the caller is responsible for placing `size_bytes` of payload at `va`
    /// before submitting.
    pub fn put_out_array_direct(&mut self, va: u32, count: u32, size_bytes: u32) {
        assert!(self.direct, "direct out-array in a non-direct call");
        assert_ne!(va, 0, "direct out-array needs a nonzero address");
        self.push_slot(va);
        self.push_slot(count);
        self.out_descs.push((va, size_bytes));
    }

    /// Absent out-array. Both slots are still present on the wire.
    pub fn put_out_array_none(&mut self) {
        self.push_slot(0);
        self.push_slot(0);
    }

    /// Host-to-guest array: `va` slot, `maxcount` slot, and (for non-direct
    /// calls) `maxcount * el_size` bytes of reserved inline space the device
    /// fills in. The device overwrites the `maxcount` slot in guest memory
    /// with the produced element count.
    pub fn put_in_array(&mut self, va: u32, maxcount: u32, el_size: u32) {
        assert_ne!(va, 0, "in-array needs a nonzero address");
        self.push_slot(va);
        self.push_slot(maxcount);
        if !self.direct {
            let size = (maxcount as usize) * (el_size as usize);
            let start = self.buf.len();
            self.buf.resize(start + align_up(size, SLOT_BYTES as usize), 0);
        }
    }

    /// Absent in-array. Both slots are still present on the wire.
    pub fn put_in_array_none(&mut self) {
        self.push_slot(0);
        self.push_slot(0);
    }

    /// Host-to-guest scalar result: `va` slot, then (when present) one slot
    /// the device writes the value through to guest memory.
    pub fn put_in_arg(&mut self, va: u32) {
        self.push_slot(va);
        if va != 0 {
            self.push_slot(0);
        }
    }

    fn push_slot(&mut self, v: u32) {
        let start = self.buf.len();
        self.buf.resize(start + SLOT_BYTES as usize, 0);
        self.buf[start..start + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn push_bytes_padded(&mut self, bytes: &[u8]) {
        let start = self.buf.len();
        self.buf.resize(start + align_up(bytes.len(), SLOT_BYTES as usize), 0);
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn write_u32_at(&mut self, offset: u32, v: u32) {
        let offset = offset as usize;
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new()
    }
}
