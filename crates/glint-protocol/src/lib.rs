//! Guest↔host wire ABI for the glint call-transport device.
//!
//! Everything the guest driver and the host device agree on byte-for-byte
//! lives here: the batch header and call stream layout ([`wire`]), the MMIO
//! register map and attach-page layout ([`regs`]), and a canonical batch
//! encoder ([`writer`]) used by tests and host-side tooling.
//!
//! The stream convention is 8-byte slots: every scalar, handle, and guest
//! address occupies one slot with the value little-endian in the low bytes.
//! This keeps all values naturally aligned regardless of their type, so
//! both sides can decode with plain loads.
#![forbid(unsafe_code)]

pub mod regs;
pub mod wire;
pub mod writer;

pub use wire::{
    ApiId, BatchHeader, BatchStatus, EglFunc, GlesFunc, GLINT_PROTOCOL_VERSION, MAX_IN_ARRAYS,
    NUM_APIS,
};
pub use writer::BatchWriter;

#[cfg(test)]
mod tests;
