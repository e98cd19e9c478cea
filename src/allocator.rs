//! Logical-to-physical block allocator: assigns a fresh mirrored
//! placement to a newly written logical block.
//!
//! A single `(disk, block)` cursor advances one disk at a time, wrapping
//! to the next block once every disk at the current block has been
//! used. Pairing a primary with the very next cursor value naturally
//! lands the mirror on a different disk, except at the `(DISKS - 1,
//! BLOCKS_PER_DISK - 1)` boundary, where advancing wraps back to disk 0
//! at a block that is already full. Per spec.md §4.3 normative choice
//! (a), the allocator re-advances past that collision explicitly rather
//! than ever returning a placement with `primary.disk == mirror.disk`.
use crate::error::{DriverError, Result};
use crate::types::PhysAddr;

pub struct Allocator {
    disks: u8,
    blocks_per_disk: u32,
    next_disk: u8,
    next_block: u32,
    exhausted: bool,
}

impl Allocator {
    pub fn init(disks: u8, blocks_per_disk: u32) -> Self {
        Allocator {
            disks,
            blocks_per_disk,
            next_disk: 0,
            next_block: 0,
            exhausted: false,
        }
    }

    /// Returns the current cursor, then advances it one disk at a time,
    /// wrapping to the next block when every disk has been handed out at
    /// the current block.
    fn take(&mut self) -> Result<PhysAddr> {
        if self.exhausted {
            return Err(DriverError::CapacityExhausted);
        }
        let addr = PhysAddr::new(self.next_disk, self.next_block);
        self.next_disk += 1;
        if self.next_disk == self.disks {
            self.next_disk = 0;
            self.next_block += 1;
            if self.next_block == self.blocks_per_disk {
                self.exhausted = true;
            }
        }
        Ok(addr)
    }

    pub fn allocate_primary(&mut self) -> Result<PhysAddr> {
        self.take()
    }

    /// Allocates the mirror for a placement whose primary landed on
    /// `primary_disk`. Re-advances past a same-disk collision instead of
    /// ever handing back a mirror on the primary's disk.
    pub fn allocate_mirror(&mut self, primary_disk: u8) -> Result<PhysAddr> {
        let mut mirror = self.take()?;
        while mirror.disk == primary_disk {
            mirror = self.take()?;
        }
        Ok(mirror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_lands_on_origin() {
        let mut alloc = Allocator::init(9, 4096);
        let primary = alloc.allocate_primary().unwrap();
        assert_eq!(primary, PhysAddr::new(0, 0));
        let mirror = alloc.allocate_mirror(primary.disk).unwrap();
        assert_eq!(mirror, PhysAddr::new(1, 0));
    }

    #[test]
    fn mirror_disjointness_holds_across_many_allocations() {
        let mut alloc = Allocator::init(3, 4);
        for _ in 0..(3 * 4 / 2) {
            let primary = alloc.allocate_primary().unwrap();
            let mirror = alloc.allocate_mirror(primary.disk).unwrap();
            assert_ne!(primary.disk, mirror.disk);
        }
    }

    #[test]
    fn exhaustion_at_the_final_slot_fails_the_mirror_not_the_disjointness() {
        // The last primary takeable is (DISKS-1, BLOCKS_PER_DISK-1); the
        // mirror allocation that follows it must fail cleanly
        // (CapacityExhausted) rather than ever returning a same-disk
        // mirror or a stale address.
        let mut alloc = Allocator::init(2, 1);
        let primary = alloc.allocate_primary().unwrap();
        assert_eq!(primary, PhysAddr::new(0, 0));
        let mirror = alloc.allocate_mirror(primary.disk).unwrap();
        assert_eq!(mirror, PhysAddr::new(1, 0));
        assert_ne!(primary.disk, mirror.disk);
        // That consumed the array's only 2 slots.
        assert!(alloc.allocate_primary().is_err());
    }

    #[test]
    fn exhaustion_fails_cleanly() {
        let mut alloc = Allocator::init(2, 2);
        // 2 disks * 2 blocks = 4 physical slots = 2 placements.
        for _ in 0..2 {
            let primary = alloc.allocate_primary().unwrap();
            alloc.allocate_mirror(primary.disk).unwrap();
        }
        assert!(alloc.allocate_primary().is_err());
    }
}
