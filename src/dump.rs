use std::fmt::{self, Write};

use crate::list::BlockList;

/// Writes the current memory state, including both the regions and blocks.
/// Entries are printed in list order, so there is an implied link from the
/// topmost entry to the next one.
///
/// ```text
/// -- Current Memory State --
/// [REGION 0] 0x7f0c2a1b4000
///   [BLOCK] 0x7f0c2a1b4000-0x7f0c2a1b4070 'Allocation 0' 112 [USED]
///   [BLOCK] 0x7f0c2a1b4070-0x7f0c2a1b5000 '' 3984 [FREE]
/// ```
///
/// Only reads the headers. The caller must hold the heap lock, and `out` must
/// not allocate through the allocator being dumped.
pub(crate) fn write_memory<W: Write>(blocks: &BlockList, out: &mut W) -> fmt::Result {
    writeln!(out, "-- Current Memory State --")?;

    let mut region = None;
    for block in blocks {
        if region != Some(block.region_id()) {
            region = Some(block.region_id());
            writeln!(out, "[REGION {}] {:#x}", block.region_id(), block.addr())?;
        }

        writeln!(
            out,
            "  [BLOCK] {:#x}-{:#x} '{}' {} [{}]",
            block.addr(),
            block.end(),
            block.name(),
            block.size(),
            if block.is_free() { "FREE" } else { "USED" },
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Name, testing::Scratch};

    #[test]
    fn empty_heap() {
        let mut out = String::new();
        write_memory(&BlockList::new(), &mut out).unwrap();

        assert_eq!(out, "-- Current Memory State --\n");
    }

    #[test]
    fn one_region_line_per_region() {
        let mut scratch = Scratch::new(1024);
        let mut blocks = BlockList::new();
        let a = scratch.block(0, 200, 0);
        let b = scratch.block(200, 312, 0);
        let c = scratch.block(512, 512, 1);
        a.set_free(false);
        a.set_name(Name::allocation(0));
        c.set_name(Name::from_label("frame"));
        for block in [a, b, c] {
            blocks.append(block);
        }

        let mut out = String::new();
        write_memory(&blocks, &mut out).unwrap();

        let base = a.addr();
        let expected = format!(
            "-- Current Memory State --\n\
             [REGION 0] {:#x}\n  \
             [BLOCK] {:#x}-{:#x} 'Allocation 0' 200 [USED]\n  \
             [BLOCK] {:#x}-{:#x} '' 312 [FREE]\n\
             [REGION 1] {:#x}\n  \
             [BLOCK] {:#x}-{:#x} 'frame' 512 [FREE]\n",
            base,
            base,
            base + 200,
            base + 200,
            base + 512,
            base + 512,
            base + 512,
            base + 1024,
        );
        assert_eq!(out, expected);
    }
}
