//! Guest physical memory access for the glint device model.
//!
//! Everything the device reads from or writes to the guest goes through the
//! [`GuestMemory`] trait. Accesses are fallible: the guest hands the device
//! raw physical addresses, and a bad address must surface as a
//! [`GuestMemoryError`] the caller can turn into a wire-level retry, never
//! as a panic.
//!
//! [`LockedRegion`] is a bounds-checked window over guest memory, used for
//! the per-thread call buffer the device writes status and results through.
//! [`CompiledTransfer`] is a pre-validated bulk write target, used for
//! surface pixel buffers that get re-written every frame.
#![forbid(unsafe_code)]

pub mod guest;
pub mod region;
pub mod transfer;

pub use guest::{FaultingMemory, GuestMemory, GuestMemoryError, SharedGuestMemory, VecGuestMemory};
pub use region::LockedRegion;
pub use transfer::CompiledTransfer;

#[cfg(test)]
mod tests;
