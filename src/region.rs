//! Operations on memory regions.
//!
//! [`libc::mmap`] gives us memory regions aligned with the computer page size.
//! But, we cannot use a full region each time the user allocates memory since
//! we would be wasting a lot of space. Also, we cannot assume regions are
//! adjacent. A region is therefore never a node on its own: it is the run of
//! consecutive blocks in the [`BlockList`] that share its `region_id`.
//!
//! ```text
//!   region 0                          region 1
//! +----------------------------+   +---------------------+
//! | +------+ +------+ +------+ |   | +------+ +--------+ |
//! | | used | | free | | used | |   | | used | |  free  | |
//! | +------+ +------+ +------+ |   | +------+ +--------+ |
//! +----------------------------+   +---------------------+
//! ```
//!
//! Blocks are carved out of a region by [`split`] and glued back together by
//! [`merge`]. Once a region is a single free block again, [`release`] gives
//! it back to the kernel.

use crate::{
    block::{ALIGNMENT, BlockPtr, HEADER_SIZE},
    error::{AllocError, AllocResult},
    kernel,
    list::BlockList,
    utils::align,
};

/// Maps a new region big enough for a block of `size` bytes (header included)
/// and appends it to `blocks` as a single free block tagged `region_id`.
///
/// The region is rounded up to whole pages. If the kernel refuses the mapping
/// the list is left untouched.
pub(crate) fn acquire(blocks: &mut BlockList, size: usize, region_id: u64) -> AllocResult<BlockPtr> {
    let len = align(size, kernel::page_size()).ok_or(AllocError::SizeOverflow { size })?;

    let addr = unsafe { kernel::request_memory(len) }.map_err(|code| AllocError::MapFailed { len, code })?;

    // Fresh mappings are page aligned and `len` bytes long.
    let block = unsafe { BlockPtr::write(addr, len, region_id) };
    blocks.append(block);

    Ok(block)
}

/// Splits the free `block` so that it is exactly `size` bytes (header included)
/// and returns the free remainder, linked right after it.
///
/// No split happens on a perfect fit, or when the remainder could not hold a
/// header plus the minimum alignment. In that case the whole block is handed
/// over and `None` is returned.
pub(crate) fn split(blocks: &mut BlockList, block: BlockPtr, size: usize) -> Option<BlockPtr> {
    debug_assert!(block.size() >= size && size % ALIGNMENT == 0);

    let remainder = block.size() - size;
    if remainder == 0 || remainder < HEADER_SIZE + ALIGNMENT {
        return None;
    }

    block.set_size(size);

    // SAFETY: `block.end()` now lies `remainder` bytes before the old end of the
    // block, inside the same region, and is 8-byte aligned.
    let rest = unsafe { BlockPtr::write(block.as_non_null().add(size), remainder, block.region_id()) };
    blocks.insert_after(block, rest);

    Some(rest)
}

/// Merges the free `block` with its free neighbours of the same region and
/// returns the resulting block.
///
/// Blocks of different regions are never merged even if they happen to be
/// adjacent in memory, since each region is mapped and unmapped on its own.
pub(crate) fn merge(blocks: &mut BlockList, block: BlockPtr) -> BlockPtr {
    let mut block = block;

    if let Some(prev) = block.prev().filter(|prev| prev.is_free() && prev.same_region(block)) {
        prev.set_size(prev.size() + block.size());
        blocks.remove(block);
        block = prev;
    }

    if let Some(next) = block.next().filter(|next| next.is_free() && next.same_region(block)) {
        block.set_size(block.size() + next.size());
        blocks.remove(next);
    }

    block
}

/// Whether `block` is the only block left in its region.
pub(crate) fn is_whole(block: BlockPtr) -> bool {
    let alone_before = block.prev().is_none_or(|prev| !prev.same_region(block));
    let alone_after = block.next().is_none_or(|next| !next.same_region(block));

    alone_before && alone_after
}

/// Unlinks `block`, which must be the whole of its region, and unmaps the region.
///
/// If unmapping fails the block stays unlinked: the range can not be trusted
/// anymore and is leaked.
pub(crate) fn release(blocks: &mut BlockList, block: BlockPtr) -> AllocResult<()> {
    debug_assert!(block.is_free() && is_whole(block));

    let (addr, len) = (block.addr(), block.size());
    blocks.remove(block);

    unsafe { kernel::return_memory(block.as_non_null(), len) }.map_err(|code| AllocError::UnmapFailed { addr, len, code })
}
