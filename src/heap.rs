use std::ptr::NonNull;

use crate::{
    block::{ALIGNMENT, BlockPtr, HEADER_SIZE, Name},
    error::{AllocError, AllocResult},
    fit::FitStrategy,
    list::BlockList,
    region,
    utils::align,
};

/// The internal data structure of the allocator: every block of every region
/// plus the counters used to label them. Nothing here is synchronized, the
/// [`crate::MemAlloc`] facade keeps it behind its lock.
pub(crate) struct Heap {
    pub blocks: BlockList,
    /// Id of the next region to be mapped.
    regions: u64,
    /// Id of the next allocation, used for default names.
    allocations: u64,
}

// SAFETY: the raw pointers in `blocks` point into regions owned by this heap,
// not into any thread's memory.
unsafe impl Send for Heap {}

/// A block just handed out by [`Heap::allocate`].
pub(crate) struct Grant {
    pub block: BlockPtr,
    /// Id of the region mapped to serve it, if one had to be mapped.
    pub mapped: Option<u64>,
}

/// What [`Heap::release`] did with the freed block.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Released {
    /// The block went back to its region.
    Block { size: usize },
    /// The region became empty and was unmapped.
    Region { id: u64, len: usize },
}

/// Header inclusive, aligned size of a block holding `size` bytes.
pub(crate) fn block_size(size: usize) -> AllocResult<usize> {
    size.checked_add(HEADER_SIZE)
        .and_then(|total| align(total, ALIGNMENT))
        .ok_or(AllocError::SizeOverflow { size })
}

impl Heap {
    pub const fn new() -> Self {
        Self {
            blocks: BlockList::new(),
            regions: 0,
            allocations: 0,
        }
    }

    /// Hands out a block with room for `size` bytes.
    ///
    /// A free block is reused when `strategy` finds one, otherwise a new region
    /// is mapped. Either way the block is trimmed to fit.
    pub fn allocate(&mut self, size: usize, strategy: Option<FitStrategy>) -> AllocResult<Grant> {
        let needed = block_size(size)?;

        let (block, mapped) = match strategy.and_then(|strategy| strategy.find(&self.blocks, needed)) {
            Some(block) => (block, None),
            None => {
                let id = self.regions;
                let block = region::acquire(&mut self.blocks, needed, id)?;
                self.regions += 1;
                (block, Some(id))
            }
        };

        region::split(&mut self.blocks, block, needed);
        block.set_free(false);
        block.set_name(Name::allocation(self.allocations));
        self.allocations += 1;

        Ok(Grant { block, mapped })
    }

    /// Gives the block at `payload` back, merging it with free neighbours and
    /// unmapping its region once nothing in it is in use.
    ///
    /// **SAFETY**: `payload` must come from [`Heap::allocate`] on this heap and not
    /// have been released yet.
    pub unsafe fn release(&mut self, payload: NonNull<u8>) -> AllocResult<Released> {
        let block = unsafe { BlockPtr::from_payload(payload) };
        let size = block.size();

        block.set_free(true);
        let block = region::merge(&mut self.blocks, block);

        if !region::is_whole(block) {
            return Ok(Released::Block { size });
        }

        let (id, len) = (block.region_id(), block.size());
        region::release(&mut self.blocks, block)?;

        Ok(Released::Region { id, len })
    }

    /// Usable bytes of the live block at `payload`.
    ///
    /// **SAFETY**: same as [`Heap::release`].
    pub unsafe fn capacity(&self, payload: NonNull<u8>) -> usize {
        unsafe { BlockPtr::from_payload(payload).capacity() }
    }

    /// Renames the live block at `payload`.
    ///
    /// **SAFETY**: same as [`Heap::release`].
    pub unsafe fn rename(&mut self, payload: NonNull<u8>, name: Name) {
        unsafe { BlockPtr::from_payload(payload).set_name(name) }
    }
}
