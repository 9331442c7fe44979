use crate::guest::{GuestMemory, GuestMemoryError};

/// A pre-validated bulk transfer target in guest memory.
///
/// Surface pixel buffers live at a fixed guest address for the lifetime of
/// the surface and are re-written on every buffer swap. Compiling the
/// transfer once up front keeps the per-frame path to a single bounds check
/// plus the copy.
///
/// [`CompiledTransfer::prepare`] re-probes the range and is called once per
/// batch before any `exec`, so a buffer the guest unmapped between batches
/// is caught before pixels move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledTransfer {
    va: u64,
    len: u32,
}

impl CompiledTransfer {
    pub fn new(
        mem: &mut dyn GuestMemory,
        va: u64,
        len: u32,
    ) -> Result<Self, GuestMemoryError> {
        let transfer = Self { va, len };
        transfer.prepare(mem)?;
        Ok(transfer)
    }

    pub fn va(&self) -> u64 {
        self.va
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn prepare(&self, mem: &mut dyn GuestMemory) -> Result<(), GuestMemoryError> {
        if self.len == 0 {
            return Ok(());
        }
        let mut probe = [0u8; 1];
        mem.read(self.va, &mut probe)?;
        mem.read(self.va + u64::from(self.len) - 1, &mut probe)
    }

    /// Writes `data` to the guest buffer. `data` must cover the compiled
    /// length exactly.
    pub fn exec(&self, mem: &mut dyn GuestMemory, data: &[u8]) -> Result<(), GuestMemoryError> {
        assert_eq!(data.len(), self.len as usize);
        mem.write(self.va, data)
    }

    /// Reads the guest buffer into `dst`. `dst` must cover the compiled
    /// length exactly.
    pub fn fetch(&self, mem: &mut dyn GuestMemory, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        assert_eq!(dst.len(), self.len as usize);
        mem.read(self.va, dst)
    }
}
