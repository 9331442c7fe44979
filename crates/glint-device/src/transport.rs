//! Batch decoding and result write-back over a guest call buffer.
//!
//! A [`Transport`] sits on one attached call buffer, pinned for the lifetime
//! of the guest thread as a [`LockedRegion`]. [`Transport::begin`] snapshots
//! the batch header and call stream into host memory and prefetches the
//! payload of every direct out-array from the descriptor table at the end of
//! the stream, so call replay never touches guest memory on the read side.
//! Results flow the other way: in-array counts and in-argument values are
//! written straight back into their stream slots as each call executes,
//! non-direct in-array payloads overwrite their inline reservation, and
//! direct in-array payloads are held until [`Transport::end`] and then
//! written to their guest virtual addresses in one pass.
//!
//! Guest memory can fault at either edge (prefetch or final write-back).
//! Both paths publish [`BatchStatus::Retry`] in the status slot instead of
//! failing, and the guest resubmits the whole batch once its pages are
//! resident.

use glint_mem::{GuestMemory, GuestMemoryError, LockedRegion, SharedGuestMemory};
use glint_protocol::wire::{
    align_up_slot, BATCH_FENCE_SEQ_OFFSET, BATCH_OUT_ARRAY_COUNT_OFFSET, BATCH_SIZE_OFFSET,
    BATCH_STATUS_OFFSET, CALL_API_ID_OFFSET, CALL_DIRECT_OFFSET, CALL_FUNC_ID_OFFSET,
    CALL_HEADER_SIZE_BYTES, OUT_ARRAY_DESC_SIZE_BYTES, OUT_ARRAY_DESC_SIZE_OFFSET,
    OUT_ARRAY_DESC_VA_OFFSET, SLOT_BYTES,
};
use glint_protocol::{BatchHeader, BatchStatus};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The call stream claims more bytes than the batch holds.
    #[error("call stream truncated: need {len} bytes at offset {offset}")]
    Truncated { offset: u32, len: u32 },
    /// A direct out-array does not line up with its descriptor.
    #[error("out-array descriptor {index} does not match its call record")]
    BadDescriptor { index: u32 },
    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
}

/// Call record header, as returned by [`Transport::begin_call`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallHeader {
    pub api_id: u32,
    pub func_id: u32,
    pub direct: bool,
}

/// Parsed in-array argument. Produced by [`Transport::get_in_array`] and
/// redeemed with [`Transport::put_in_array`] once the host has results.
#[derive(Clone, Copy, Debug)]
pub struct InArrayRef {
    va: u32,
    count_slot: u32,
    payload_off: u32,
    maxcount: u32,
    el_size: u32,
    direct: bool,
}

impl InArrayRef {
    /// Element capacity the guest reserved.
    pub fn maxcount(&self) -> u32 {
        self.maxcount
    }

    /// True when the guest passed a NULL array and only wants the count.
    pub fn is_null(&self) -> bool {
        self.va == 0
    }
}

/// Parsed in-argument slot, redeemed with [`Transport::put_in_arg`].
#[derive(Clone, Copy, Debug)]
pub struct InArgRef {
    value_slot: u32,
}

struct OutDesc {
    va: u32,
    size: u32,
    data_off: u32,
}

struct PendingWrite {
    va: u32,
    bytes: Vec<u8>,
}

/// Decoder for one guest thread's call buffer.
pub struct Transport {
    region: LockedRegion,
    /// Host copy of the batch: header and call stream up to `stream_end`,
    /// then the prefetched direct out-array payloads in descriptor order.
    data: Vec<u8>,
    descs: Vec<OutDesc>,
    desc_idx: usize,
    pending: Vec<PendingWrite>,
    cursor: u32,
    stream_end: u32,
    call_direct: bool,
}

impl Transport {
    pub fn new(region: LockedRegion) -> Self {
        Self {
            region,
            data: Vec::new(),
            descs: Vec::new(),
            desc_idx: 0,
            pending: Vec::new(),
            cursor: 0,
            stream_end: 0,
            call_direct: false,
        }
    }

    /// Guest physical base of the attached call buffer.
    pub fn buffer_base(&self) -> u64 {
        self.region.base()
    }

    /// Snapshots the submitted batch out of guest memory.
    ///
    /// Returns the batch header, or `None` when a prefetch fault was
    /// answered with a retry status. Anything else is a malformed batch.
    pub fn begin(&mut self, mem: &SharedGuestMemory) -> Result<Option<BatchHeader>, TransportError> {
        self.reset();
        let mut guard = mem.lock().unwrap();
        let m = &mut *guard;
        match self.load_batch(m) {
            Ok(header) => Ok(Some(header)),
            Err(TransportError::Memory(err)) => {
                debug!(error = %err, "batch prefetch faulted, asking the guest to retry");
                self.region.write_u32(m, BATCH_STATUS_OFFSET, BatchStatus::Retry as u32)?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Header of the next call record, or `None` at the end of the stream.
    pub fn begin_call(&mut self) -> Result<Option<CallHeader>, TransportError> {
        if self.cursor >= self.stream_end {
            return Ok(None);
        }
        let start = self.cursor;
        let api_id = self.slot(start + CALL_API_ID_OFFSET)?;
        let func_id = self.slot(start + CALL_FUNC_ID_OFFSET)?;
        let direct = self.slot(start + CALL_DIRECT_OFFSET)? != 0;
        self.cursor = start + CALL_HEADER_SIZE_BYTES;
        self.call_direct = direct;
        Ok(Some(CallHeader { api_id, func_id, direct }))
    }

    pub fn get_u32(&mut self) -> Result<u32, TransportError> {
        self.take_slot()
    }

    pub fn get_i32(&mut self) -> Result<i32, TransportError> {
        Ok(self.take_slot()? as i32)
    }

    pub fn get_f32(&mut self) -> Result<f32, TransportError> {
        Ok(f32::from_bits(self.take_slot()?))
    }

    /// Guest virtual address argument. One slot on the wire.
    pub fn get_va(&mut self) -> Result<u64, TransportError> {
        Ok(u64::from(self.take_slot()?))
    }

    /// Raw bytes of the next out-array argument.
    pub fn get_out_array_bytes(&mut self) -> Result<Vec<u8>, TransportError> {
        let (off, len) = self.take_out_array(1)?;
        Ok(self.data[off..off + len].to_vec())
    }

    pub fn get_out_array_u32(&mut self) -> Result<Vec<u32>, TransportError> {
        let (off, len) = self.take_out_array(4)?;
        Ok(self.data[off..off + len]
            .chunks_exact(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word.copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect())
    }

    pub fn get_out_array_i32(&mut self) -> Result<Vec<i32>, TransportError> {
        let (off, len) = self.take_out_array(4)?;
        Ok(self.data[off..off + len]
            .chunks_exact(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word.copy_from_slice(chunk);
                i32::from_le_bytes(word)
            })
            .collect())
    }

    /// Parses the next in-array argument without filling it yet.
    pub fn get_in_array(&mut self, el_size: u32) -> Result<InArrayRef, TransportError> {
        let va = self.take_slot()?;
        let count_slot = self.cursor;
        let maxcount = self.take_slot()?;
        let mut payload_off = 0;
        if va != 0 && !self.call_direct {
            let len = u64::from(maxcount) * u64::from(el_size);
            let remaining = u64::from(self.stream_end - self.cursor);
            if len > remaining {
                return Err(TransportError::Truncated {
                    offset: self.cursor,
                    len: len.min(u64::from(u32::MAX)) as u32,
                });
            }
            let padded = align_up_slot(len as u32);
            if u64::from(self.cursor) + u64::from(padded) > u64::from(self.stream_end) {
                return Err(TransportError::Truncated {
                    offset: self.cursor,
                    len: padded,
                });
            }
            payload_off = self.cursor;
            self.cursor += padded;
        }
        Ok(InArrayRef {
            va,
            count_slot,
            payload_off,
            maxcount,
            el_size,
            direct: self.call_direct,
        })
    }

    /// Publishes the element count and payload of an in-array.
    ///
    /// The count lands in the argument's count slot right away. A NULL
    /// array takes only the count, which may exceed its zero capacity;
    /// that is how size queries report the total. Non-direct payloads
    /// overwrite the inline reservation, direct payloads are queued for
    /// [`Transport::end`].
    pub fn put_in_array(
        &mut self,
        mem: &SharedGuestMemory,
        arr: InArrayRef,
        payload: &[u8],
        count: u32,
    ) -> Result<(), TransportError> {
        if !arr.is_null() {
            debug_assert!(count <= arr.maxcount);
            debug_assert_eq!(payload.len() as u64, u64::from(count) * u64::from(arr.el_size));
        }
        let mut guard = mem.lock().unwrap();
        let m = &mut *guard;
        self.region.write_u32(m, arr.count_slot, count)?;
        if arr.is_null() || payload.is_empty() {
            return Ok(());
        }
        if arr.direct {
            self.pending.push(PendingWrite {
                va: arr.va,
                bytes: payload.to_vec(),
            });
        } else {
            self.region.write_bytes(m, arr.payload_off, payload)?;
        }
        Ok(())
    }

    /// Parses the next in-argument. `None` means the guest passed NULL and
    /// the result value has no slot on the wire.
    pub fn get_in_arg(&mut self) -> Result<Option<InArgRef>, TransportError> {
        let va = self.take_slot()?;
        if va == 0 {
            return Ok(None);
        }
        let value_slot = self.cursor;
        self.take_slot()?;
        Ok(Some(InArgRef { value_slot }))
    }

    /// Writes an in-argument result into its stream slot.
    pub fn put_in_arg(
        &self,
        mem: &SharedGuestMemory,
        arg: InArgRef,
        value: u32,
    ) -> Result<(), TransportError> {
        let mut guard = mem.lock().unwrap();
        self.region.write_u32(&mut *guard, arg.value_slot, value)?;
        Ok(())
    }

    /// Flushes queued direct in-array payloads and publishes the status.
    ///
    /// A write fault turns into [`BatchStatus::Retry`]; the queued payloads
    /// are rebuilt when the guest resubmits.
    pub fn end(&mut self, mem: &SharedGuestMemory) -> Result<BatchStatus, TransportError> {
        let mut guard = mem.lock().unwrap();
        let m = &mut *guard;
        for write in &self.pending {
            if let Err(err) = m.write(u64::from(write.va), &write.bytes) {
                debug!(
                    va = write.va,
                    len = write.bytes.len(),
                    error = %err,
                    "in-array write-back faulted, asking the guest to retry"
                );
                self.region.write_u32(m, BATCH_STATUS_OFFSET, BatchStatus::Retry as u32)?;
                return Ok(BatchStatus::Retry);
            }
        }
        self.pending.clear();
        self.region.write_u32(m, BATCH_STATUS_OFFSET, BatchStatus::Ok as u32)?;
        Ok(BatchStatus::Ok)
    }

    /// Publishes `status` without touching anything else. Used on paths
    /// that abort the batch.
    pub fn write_status(
        &self,
        mem: &SharedGuestMemory,
        status: BatchStatus,
    ) -> Result<(), TransportError> {
        let mut guard = mem.lock().unwrap();
        self.region
            .write_u32(&mut *guard, BATCH_STATUS_OFFSET, status as u32)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.data.clear();
        self.descs.clear();
        self.desc_idx = 0;
        self.pending.clear();
        self.cursor = 0;
        self.stream_end = 0;
        self.call_direct = false;
    }

    fn load_batch(&mut self, m: &mut dyn GuestMemory) -> Result<BatchHeader, TransportError> {
        let header = BatchHeader {
            fence_seq: self.region.read_u32(m, BATCH_FENCE_SEQ_OFFSET)?,
            batch_size: self.region.read_u32(m, BATCH_SIZE_OFFSET)?,
            out_array_count: self.region.read_u32(m, BATCH_OUT_ARRAY_COUNT_OFFSET)?,
        };
        let stream_end = u64::from(BatchHeader::SIZE_BYTES) + u64::from(header.batch_size);
        let desc_bytes = u64::from(header.out_array_count) * u64::from(OUT_ARRAY_DESC_SIZE_BYTES);
        if stream_end + desc_bytes > u64::from(self.region.len()) {
            return Err(TransportError::Truncated {
                offset: BatchHeader::SIZE_BYTES,
                len: (stream_end + desc_bytes).min(u64::from(u32::MAX)) as u32,
            });
        }
        let stream_end = stream_end as u32;
        self.data.resize(stream_end as usize, 0);
        self.region.read_bytes(m, 0, &mut self.data)?;
        for index in 0..header.out_array_count {
            let desc_off = stream_end + index * OUT_ARRAY_DESC_SIZE_BYTES;
            let va = self.region.read_u32(m, desc_off + OUT_ARRAY_DESC_VA_OFFSET)?;
            let size = self.region.read_u32(m, desc_off + OUT_ARRAY_DESC_SIZE_OFFSET)?;
            let data_off = self.data.len() as u32;
            if size > 0 {
                // Bounds-probe before reserving host memory for the payload.
                m.read_u8(u64::from(va))?;
                m.read_u8(u64::from(va) + u64::from(size) - 1)?;
                let start = self.data.len();
                self.data.resize(start + size as usize, 0);
                m.read(u64::from(va), &mut self.data[start..])?;
            }
            self.descs.push(OutDesc { va, size, data_off });
        }
        self.cursor = BatchHeader::SIZE_BYTES;
        self.stream_end = stream_end;
        Ok(header)
    }

    fn slot(&self, offset: u32) -> Result<u32, TransportError> {
        if u64::from(offset) + u64::from(SLOT_BYTES) > u64::from(self.stream_end) {
            return Err(TransportError::Truncated {
                offset,
                len: SLOT_BYTES,
            });
        }
        let off = offset as usize;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.data[off..off + 4]);
        Ok(u32::from_le_bytes(word))
    }

    fn take_slot(&mut self) -> Result<u32, TransportError> {
        let value = self.slot(self.cursor)?;
        self.cursor += SLOT_BYTES;
        Ok(value)
    }

    /// Consumes the next out-array argument, returning the payload's range
    /// within `data`.
    fn take_out_array(&mut self, el_size: u32) -> Result<(usize, usize), TransportError> {
        let va = self.take_slot()?;
        let count = self.take_slot()?;
        if va == 0 {
            return Ok((0, 0));
        }
        let len = u64::from(count) * u64::from(el_size);
        if self.call_direct {
            let index = self.desc_idx;
            let desc = self
                .descs
                .get(index)
                .ok_or(TransportError::BadDescriptor { index: index as u32 })?;
            if desc.va != va || u64::from(desc.size) != len {
                return Err(TransportError::BadDescriptor { index: index as u32 });
            }
            self.desc_idx += 1;
            Ok((desc.data_off as usize, desc.size as usize))
        } else {
            let start = self.cursor;
            let remaining = u64::from(self.stream_end - start);
            if len > remaining {
                return Err(TransportError::Truncated {
                    offset: start,
                    len: len.min(u64::from(u32::MAX)) as u32,
                });
            }
            let padded = align_up_slot(len as u32);
            if u64::from(start) + u64::from(padded) > u64::from(self.stream_end) {
                return Err(TransportError::Truncated {
                    offset: start,
                    len: padded,
                });
            }
            self.cursor = start + padded;
            Ok((start as usize, len as usize))
        }
    }
}
