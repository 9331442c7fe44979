use crate::guest::{FaultingMemory, GuestMemory, VecGuestMemory};
use crate::region::LockedRegion;

#[test]
fn new_probes_both_ends() {
    let mut mem = VecGuestMemory::new(0x1000);

    let region = LockedRegion::new(&mut mem, 0x100, 0x200).unwrap();
    assert_eq!(region.base(), 0x100);
    assert_eq!(region.len(), 0x200);

    // Region extending past the end of memory is rejected up front.
    assert!(LockedRegion::new(&mut mem, 0xf00, 0x200).is_err());
    assert!(LockedRegion::new(&mut mem, 0x2000, 0x10).is_err());
    assert!(LockedRegion::new(&mut mem, 0x100, 0).is_err());
}

#[test]
fn accesses_are_region_relative_and_bounded() {
    let mut mem = VecGuestMemory::new(0x1000);
    let region = LockedRegion::new(&mut mem, 0x100, 0x40).unwrap();

    region.write_u32(&mut mem, 0x08, 0xdead_beef).unwrap();
    assert_eq!(region.read_u32(&mut mem, 0x08).unwrap(), 0xdead_beef);
    // The write landed at base + offset in guest terms.
    assert_eq!(mem.read_u32(0x108).unwrap(), 0xdead_beef);

    region.write_bytes(&mut mem, 0x3c, &[1, 2, 3, 4]).unwrap();
    assert!(region.write_bytes(&mut mem, 0x3d, &[1, 2, 3, 4]).is_err());
    assert!(region.read_u32(&mut mem, 0x40).is_err());

    // A failed access never touches guest memory.
    assert_eq!(mem.read_u8(0x140).unwrap(), 0);
}

#[test]
fn construction_fails_when_backing_is_absent() {
    let mut mem = FaultingMemory::new(VecGuestMemory::new(0x1000));
    mem.fail_range(0x1f0, 0x10);

    assert!(LockedRegion::new(&mut mem, 0x100, 0x100).is_err());
    assert!(LockedRegion::new(&mut mem, 0x100, 0x80).is_ok());
}
