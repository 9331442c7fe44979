use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    #[error("guest memory access out of bounds (gpa=0x{gpa:x}, len={len})")]
    OutOfBounds { gpa: u64, len: usize },
}

/// Abstraction for guest physical memory access.
///
/// Reads and writes take `&mut self`: implementations may route accesses
/// through MMIO-like side effects or update internal fault state. All
/// multi-byte accessors are little-endian, matching the guest ABI.
pub trait GuestMemory {
    fn read(&mut self, gpa: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError>;
    fn write(&mut self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryError>;

    fn read_u8(&mut self, gpa: u64) -> Result<u8, GuestMemoryError> {
        let mut buf = [0u8; 1];
        self.read(gpa, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self, gpa: u64) -> Result<u16, GuestMemoryError> {
        let mut buf = [0u8; 2];
        self.read(gpa, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self, gpa: u64) -> Result<u32, GuestMemoryError> {
        let mut buf = [0u8; 4];
        self.read(gpa, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self, gpa: u64) -> Result<u64, GuestMemoryError> {
        let mut buf = [0u8; 8];
        self.read(gpa, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn write_u8(&mut self, gpa: u64, val: u8) -> Result<(), GuestMemoryError> {
        self.write(gpa, &[val])
    }

    fn write_u16(&mut self, gpa: u64, val: u16) -> Result<(), GuestMemoryError> {
        self.write(gpa, &val.to_le_bytes())
    }

    fn write_u32(&mut self, gpa: u64, val: u32) -> Result<(), GuestMemoryError> {
        self.write(gpa, &val.to_le_bytes())
    }

    fn write_u64(&mut self, gpa: u64, val: u64) -> Result<(), GuestMemoryError> {
        self.write(gpa, &val.to_le_bytes())
    }
}

/// Guest memory handle shared between the device front-end and the batch
/// workers. Accesses are short (a slot or one bulk copy), so one mutex is
/// enough.
pub type SharedGuestMemory = Arc<Mutex<dyn GuestMemory + Send>>;

/// A simple in-memory guest memory implementation backed by a single
/// `Vec<u8>`. The address space starts at GPA 0.
#[derive(Debug, Clone)]
pub struct VecGuestMemory {
    data: Vec<u8>,
}

impl VecGuestMemory {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            data: vec![0u8; size_bytes],
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    fn range(&self, gpa: u64, len: usize) -> Result<(usize, usize), GuestMemoryError> {
        let start: usize = gpa
            .try_into()
            .map_err(|_| GuestMemoryError::OutOfBounds { gpa, len })?;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(GuestMemoryError::OutOfBounds { gpa, len })?;
        Ok((start, end))
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&mut self, gpa: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        let (start, end) = self.range(gpa, dst.len())?;
        dst.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write(&mut self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        let (start, end) = self.range(gpa, src.len())?;
        self.data[start..end].copy_from_slice(src);
        Ok(())
    }
}

/// Wrapper that fails accesses overlapping a poisoned range. Used by tests
/// to exercise the retry paths a paged-out guest buffer would trigger.
#[derive(Debug)]
pub struct FaultingMemory<M> {
    inner: M,
    fault: Option<(u64, u64)>,
}

impl<M: GuestMemory> FaultingMemory<M> {
    pub fn new(inner: M) -> Self {
        Self { inner, fault: None }
    }

    /// Makes every access overlapping `[gpa, gpa + len)` fail until cleared.
    pub fn fail_range(&mut self, gpa: u64, len: u64) {
        self.fault = Some((gpa, len));
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    pub fn inner_mut(&mut self) -> &mut M {
        &mut self.inner
    }

    fn check(&self, gpa: u64, len: usize) -> Result<(), GuestMemoryError> {
        if let Some((fault_gpa, fault_len)) = self.fault {
            let end = gpa.saturating_add(len as u64);
            let fault_end = fault_gpa.saturating_add(fault_len);
            if gpa < fault_end && fault_gpa < end {
                return Err(GuestMemoryError::OutOfBounds { gpa, len });
            }
        }
        Ok(())
    }
}

impl<M: GuestMemory> GuestMemory for FaultingMemory<M> {
    fn read(&mut self, gpa: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        self.check(gpa, dst.len())?;
        self.inner.read(gpa, dst)
    }

    fn write(&mut self, gpa: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        self.check(gpa, src.len())?;
        self.inner.write(gpa, src)
    }
}
