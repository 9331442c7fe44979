//! Dispatch seam between batch replay and the per-API host state.

use glint_mem::SharedGuestMemory;
use thiserror::Error;

use crate::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The call stream named a function the API does not have.
    #[error("unknown function id {0}")]
    UnknownFunc(u32),
    /// The call stream ran under a tid that never attached.
    #[error("no thread state for tid {0}")]
    UnknownThread(u32),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Everything a call stub needs to demarshal arguments and publish results.
pub struct CallCtx<'a> {
    pub mem: &'a SharedGuestMemory,
    pub transport: &'a mut Transport,
    pub tid: u32,
}

/// One rendering API's per-process dispatcher.
///
/// A guest process gets one of these per API; the batch replay loop routes
/// each call record to the dispatcher named by its api id. Thread and batch
/// hooks arrive on every dispatcher regardless of which APIs the batch
/// actually touches, mirroring how attach and detach work on the wire.
pub trait ApiProcess: Send {
    fn thread_init(&mut self, tid: u32);

    fn thread_fini(&mut self, tid: u32);

    /// A batch from `tid` is about to replay on the calling worker thread.
    fn batch_start(&mut self, tid: u32);

    /// The batch from `tid` finished replaying.
    fn batch_end(&mut self, tid: u32);

    /// Demarshals and executes one call record.
    ///
    /// API-level failures are reported to the guest through the call's own
    /// error and return slots and are not errors here. `Err` means the
    /// batch itself cannot continue.
    fn dispatch(&mut self, func_id: u32, ctx: &mut CallCtx<'_>) -> Result<(), DispatchError>;
}
