use crate::guest::{FaultingMemory, GuestMemory, GuestMemoryError, VecGuestMemory};

#[test]
fn vec_memory_round_trips_bytes() {
    let mut mem = VecGuestMemory::new(0x100);
    mem.write(0x10, &[1, 2, 3, 4]).unwrap();

    let mut buf = [0u8; 4];
    mem.read(0x10, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn vec_memory_rejects_out_of_bounds() {
    let mut mem = VecGuestMemory::new(0x100);

    let mut buf = [0u8; 4];
    assert_eq!(
        mem.read(0xfe, &mut buf),
        Err(GuestMemoryError::OutOfBounds { gpa: 0xfe, len: 4 })
    );
    assert_eq!(
        mem.write(0x100, &buf),
        Err(GuestMemoryError::OutOfBounds { gpa: 0x100, len: 4 })
    );

    // Access ending exactly at the boundary is fine.
    mem.read(0xfc, &mut buf).unwrap();
}

#[test]
fn vec_memory_rejects_wrapping_range() {
    let mut mem = VecGuestMemory::new(0x100);
    let mut buf = [0u8; 8];
    assert!(mem.read(u64::MAX - 3, &mut buf).is_err());
}

#[test]
fn scalar_helpers_are_little_endian() {
    let mut mem = VecGuestMemory::new(0x100);

    mem.write_u32(0, 0x1122_3344).unwrap();
    let mut buf = [0u8; 4];
    mem.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0x44, 0x33, 0x22, 0x11]);

    assert_eq!(mem.read_u32(0).unwrap(), 0x1122_3344);
    assert_eq!(mem.read_u16(0).unwrap(), 0x3344);
    assert_eq!(mem.read_u8(3).unwrap(), 0x11);

    mem.write_u64(8, 0x0102_0304_0506_0708).unwrap();
    assert_eq!(mem.read_u64(8).unwrap(), 0x0102_0304_0506_0708);
    assert_eq!(mem.read_u32(8).unwrap(), 0x0506_0708);
}

#[test]
fn faulting_memory_poisons_overlapping_accesses() {
    let mut mem = FaultingMemory::new(VecGuestMemory::new(0x100));
    mem.write(0x20, &[0xaa; 0x10]).unwrap();

    mem.fail_range(0x28, 8);

    let mut buf = [0u8; 4];
    // Entirely before and entirely after the poisoned range still work.
    mem.read(0x20, &mut buf).unwrap();
    mem.read(0x30, &mut buf).unwrap();
    // Any overlap fails.
    assert!(mem.read(0x26, &mut buf).is_err());
    assert!(mem.read(0x2a, &mut buf).is_err());
    assert!(mem.write(0x2b, &buf).is_err());

    mem.clear_fault();
    mem.read(0x28, &mut buf).unwrap();
    assert_eq!(buf, [0xaa; 4]);
}
