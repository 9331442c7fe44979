//! MMIO register map and attach-page layout.
//!
//! The device exposes one small MMIO window carved into per-user register
//! pairs. A guest thread claims a user slot, points `BUFFPTR` at its call
//! buffer page to attach, and rings `TRIGGER` to submit batches. Writing
//! zero to `BUFFPTR` detaches.

/// Per-user register block: one dword pair.
pub const REG_BUFFPTR: u32 = 0;
pub const REG_TRIGGER: u32 = 4;
pub const USER_REGS_SIZE: u32 = 8;

/// Total MMIO window size. Window size over pair size bounds the number of
/// concurrently attached guest threads.
pub const MMIO_SIZE_BYTES: u32 = 0x1000;
pub const MAX_USERS: usize = (MMIO_SIZE_BYTES / USER_REGS_SIZE) as usize;

/// `TRIGGER` write: bit 0 selects synchronous submission (the write blocks
/// until the batch completes). Other bits are reserved.
pub const TRIGGER_SYNC: u32 = 1;

/* -------------------------------- Attach page ------------------------------ */

/// Attach handshake, written by the guest at the head of the call buffer
/// before setting `BUFFPTR`. Same 8-byte slot convention as the call
/// stream. The host overwrites the version slot with the reply.
pub const ATTACH_VERSION_OFFSET: u32 = 0;
pub const ATTACH_PID_OFFSET: u32 = 8;
pub const ATTACH_TID_OFFSET: u32 = 16;
pub const ATTACH_SIZE_BYTES: u32 = 24;

pub const ATTACH_ACCEPT: u32 = 1;
pub const ATTACH_REJECT: u32 = 0;

/// Size of the shared call buffer each guest thread maps. The batch header,
/// call stream, and out-array descriptors all must fit.
pub const CALL_BUFFER_SIZE_BYTES: u32 = 0x8000;
