//! Persistent-in-memory directory from `(tagline, logical_block)` to its
//! mirrored placement. Owns every tagline's placements exclusively; the
//! allocator and cache are borrowed in, not owned, by its operations.
use log::debug;

use crate::allocator::Allocator;
use crate::bus::{check_response, BusClient, RequestFields, RequestType};
use crate::cache::Cache;
use crate::error::{DriverError, Result};
use crate::types::{PhysAddr, Placement};

/// One append-only logical block stream.
#[derive(Default)]
pub struct Tagline {
    placements: Vec<Placement>,
}

impl Tagline {
    fn next_logical_index(&self) -> u32 {
        self.placements.len() as u32
    }
}

pub struct TaglineDirectory {
    taglines: Vec<Tagline>,
    block_size: usize,
    max_logical_blocks_per_tagline: u32,
}

impl TaglineDirectory {
    pub fn init(maxlines: u32, block_size: usize, max_logical_blocks_per_tagline: u32) -> Self {
        let mut taglines = Vec::with_capacity(maxlines as usize);
        taglines.resize_with(maxlines as usize, Tagline::default);
        TaglineDirectory {
            taglines,
            block_size,
            max_logical_blocks_per_tagline,
        }
    }

    pub fn maxlines(&self) -> u32 {
        self.taglines.len() as u32
    }

    fn tagline(&self, tag: u16) -> Result<&Tagline> {
        self.taglines.get(tag as usize).ok_or_else(|| {
            DriverError::InvalidArgument(format!("tagline {tag} out of range"))
        })
    }

    fn tagline_mut(&mut self, tag: u16) -> Result<&mut Tagline> {
        let len = self.taglines.len();
        self.taglines.get_mut(tag as usize).ok_or_else(|| {
            DriverError::InvalidArgument(format!("tagline {tag} out of range (maxlines {len})"))
        })
    }

    pub fn placement(&self, tag: u16, bnum: u32) -> Result<Placement> {
        let tagline = self.tagline(tag)?;
        tagline
            .placements
            .get(bnum as usize)
            .copied()
            .ok_or_else(|| {
                DriverError::InvalidArgument(format!(
                    "block {bnum} beyond tagline {tag}'s high-water mark {}",
                    tagline.next_logical_index()
                ))
            })
    }

    /// Iterates every `(tag, bnum, placement)` triple currently recorded,
    /// for the recovery engine to walk.
    pub fn iter_placements(&self) -> impl Iterator<Item = (u16, u32, Placement)> + '_ {
        self.taglines.iter().enumerate().flat_map(|(tag, tagline)| {
            tagline
                .placements
                .iter()
                .enumerate()
                .map(move |(bnum, placement)| (tag as u16, bnum as u32, *placement))
        })
    }

    /// Writes `nblocks` consecutive logical blocks starting at `bnum`,
    /// allocating fresh placements for blocks at the tagline's
    /// high-water mark and overwriting in place otherwise. `buffer` must
    /// hold `nblocks * block_size` bytes.
    pub fn write<B: BusClient>(
        &mut self,
        tag: u16,
        bnum: u32,
        nblocks: u8,
        buffer: &[u8],
        cache: &mut Cache,
        allocator: &mut Allocator,
        bus: &mut B,
    ) -> Result<()> {
        for i in 0..nblocks as u32 {
            let block_bnum = bnum + i;
            let chunk = &buffer[(i as usize) * self.block_size..(i as usize + 1) * self.block_size];
            let tagline = self.tagline_mut(tag)?;
            let high_water = tagline.next_logical_index();

            let placement = if block_bnum == high_water {
                if high_water >= self.max_logical_blocks_per_tagline {
                    return Err(DriverError::InvalidArgument(format!(
                        "write to tagline {tag} block {block_bnum} exceeds max_logical_blocks_per_tagline ({})",
                        self.max_logical_blocks_per_tagline
                    )));
                }
                let primary = allocator.allocate_primary()?;
                let mirror = allocator.allocate_mirror(primary.disk)?;
                let placement = Placement::new(primary, mirror);
                self.tagline_mut(tag)?.placements.push(placement);
                debug!(
                    "tagline {tag} block {block_bnum}: allocated primary={:?} mirror={:?}",
                    placement.primary, placement.mirror
                );
                placement
            } else if block_bnum < high_water {
                self.tagline(tag)?.placements[block_bnum as usize]
            } else {
                return Err(DriverError::InvalidArgument(format!(
                    "write to tagline {tag} block {block_bnum} would create a hole (high-water mark {high_water})"
                )));
            };

            cache.put(placement.primary, chunk.to_vec(), bus)?;
            cache.put(placement.mirror, chunk.to_vec(), bus)?;
        }
        Ok(())
    }

    /// Reads `nblocks` consecutive logical blocks starting at `bnum`
    /// into `buffer`. Misses the cache on the primary and go straight to
    /// the bus; mirrors aren't consulted while the primary's disk is
    /// healthy.
    pub fn read<B: BusClient>(
        &self,
        tag: u16,
        bnum: u32,
        nblocks: u8,
        buffer: &mut [u8],
        cache: &mut Cache,
        bus: &mut B,
    ) -> Result<()> {
        for i in 0..nblocks as u32 {
            let block_bnum = bnum + i;
            let placement = self.placement(tag, block_bnum)?;
            let bytes = read_through_cache(cache, placement.primary, self.block_size, bus)?;
            let start = (i as usize) * self.block_size;
            buffer[start..start + self.block_size].copy_from_slice(&bytes);
        }
        Ok(())
    }
}

/// Shared by the read path and the recovery engine: a cache-first read
/// of one physical address, populating the cache on miss.
pub fn read_through_cache<B: BusClient>(
    cache: &mut Cache,
    addr: PhysAddr,
    block_size: usize,
    bus: &mut B,
) -> Result<Vec<u8>> {
    if let Some(buf) = cache.get(addr) {
        return Ok(buf.to_vec());
    }
    let request = RequestFields {
        request_type: RequestType::Read,
        number_of_blocks: 1,
        disk_number: addr.disk,
        block_id: addr.block,
    };
    let (response, payload) = bus.call(request, None)?;
    check_response(request, response)?;
    let bytes = payload.ok_or(DriverError::CacheInternal(
        "RAID READ reported success but carried no payload",
    ))?;
    debug_assert_eq!(bytes.len(), block_size);
    cache.put(addr, bytes.clone(), bus)?;
    Ok(bytes)
}
