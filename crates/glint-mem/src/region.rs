use crate::guest::{GuestMemory, GuestMemoryError};

/// A bounds-checked window over guest memory.
///
/// The device registers one of these per guest thread over the shared call
/// buffer. Construction probes both ends of the range, so a region that was
/// handed out successfully refers to memory that existed at registration
/// time; individual accesses still return errors if the backing goes away.
///
/// Offsets are region-relative. Any access that would leave the window
/// fails with [`GuestMemoryError::OutOfBounds`] without touching memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedRegion {
    base: u64,
    len: u32,
}

impl LockedRegion {
    pub fn new(
        mem: &mut dyn GuestMemory,
        base: u64,
        len: u32,
    ) -> Result<Self, GuestMemoryError> {
        if len == 0 {
            return Err(GuestMemoryError::OutOfBounds { gpa: base, len: 0 });
        }
        let mut probe = [0u8; 1];
        mem.read(base, &mut probe)?;
        mem.read(base + u64::from(len) - 1, &mut probe)?;
        Ok(Self { base, len })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn gpa(&self, offset: u32, len: usize) -> Result<u64, GuestMemoryError> {
        let end = u64::from(offset) + len as u64;
        if end > u64::from(self.len) {
            return Err(GuestMemoryError::OutOfBounds {
                gpa: self.base + u64::from(offset),
                len,
            });
        }
        Ok(self.base + u64::from(offset))
    }

    pub fn read_bytes(
        &self,
        mem: &mut dyn GuestMemory,
        offset: u32,
        dst: &mut [u8],
    ) -> Result<(), GuestMemoryError> {
        let gpa = self.gpa(offset, dst.len())?;
        mem.read(gpa, dst)
    }

    pub fn write_bytes(
        &self,
        mem: &mut dyn GuestMemory,
        offset: u32,
        src: &[u8],
    ) -> Result<(), GuestMemoryError> {
        let gpa = self.gpa(offset, src.len())?;
        mem.write(gpa, src)
    }

    pub fn read_u32(
        &self,
        mem: &mut dyn GuestMemory,
        offset: u32,
    ) -> Result<u32, GuestMemoryError> {
        let gpa = self.gpa(offset, 4)?;
        mem.read_u32(gpa)
    }

    pub fn write_u32(
        &self,
        mem: &mut dyn GuestMemory,
        offset: u32,
        val: u32,
    ) -> Result<(), GuestMemoryError> {
        let gpa = self.gpa(offset, 4)?;
        mem.write_u32(gpa, val)
    }
}
