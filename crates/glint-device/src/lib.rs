//! Host side of the glint paravirtual GPU device.
//!
//! The guest kernel driver exposes one MMIO register pair per guest thread
//! (see [`glint_protocol::regs`]). A thread attaches by writing the physical
//! address of its call buffer to the buffer register, then renders by filling
//! the buffer with a call batch and writing the trigger register. This crate
//! owns everything behind those registers: decoding batches out of guest
//! memory ([`transport`]), replaying them against the EGL and GLES host APIs
//! ([`apis`]), and the per-process bookkeeping that ties guest pids and tids
//! to host-side state ([`server`], [`process`]).
//!
//! Batches are executed off the MMIO path on a small worker pool
//! ([`scheduler`]). Batches from the same guest thread are chained so they
//! retire in submission order; batches from the same guest process share one
//! lock so host state never sees two of its threads at once.

#![forbid(unsafe_code)]

pub mod api;
pub mod apis;
pub mod device;
pub mod object_map;
pub mod process;
pub mod scheduler;
pub mod server;
mod stats;
pub mod transport;

pub use api::{ApiProcess, CallCtx, DispatchError};
pub use device::GlintDevice;
pub use object_map::{MapObject, ObjectMap};
pub use process::{BatchOutcome, ProcessState};
pub use scheduler::{Completion, SchedulerConfig, WorkQueue};
pub use server::GlintServer;
pub use transport::{CallHeader, InArgRef, InArrayRef, Transport, TransportError};

#[cfg(test)]
mod tests;
