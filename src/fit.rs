use std::fmt;

use crate::{block::BlockPtr, list::BlockList};

/// Free space management algorithm used to pick a free [`BlockPtr`] that can
/// be reused for a request.
///
/// All of them are read-only walks over the [`BlockList`], sizes are always
/// header inclusive. Callers must hold the heap lock while searching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStrategy {
    /// First free block, in list order, that is big enough.
    FirstFit,
    /// Free block closest in size to the request.
    BestFit,
    /// Largest free block.
    WorstFit,
}

impl FitStrategy {
    /// Parses the name used by the `ALLOCATOR_ALGORITHM` setting.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"first_fit" => Some(Self::FirstFit),
            b"best_fit" => Some(Self::BestFit),
            b"worst_fit" => Some(Self::WorstFit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstFit => "first_fit",
            Self::BestFit => "best_fit",
            Self::WorstFit => "worst_fit",
        }
    }

    /// Returns a free block of at least `size` bytes, or `None` if no block can
    /// hold it.
    pub(crate) fn find(&self, blocks: &BlockList, size: usize) -> Option<BlockPtr> {
        match self {
            Self::FirstFit => first_fit(blocks, size),
            Self::BestFit => best_fit(blocks, size),
            Self::WorstFit => worst_fit(blocks, size),
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn candidates(blocks: &BlockList, size: usize) -> impl Iterator<Item = BlockPtr> {
    blocks.iter().filter(move |block| block.is_free() && block.size() >= size)
}

fn first_fit(blocks: &BlockList, size: usize) -> Option<BlockPtr> {
    candidates(blocks, size).next()
}

/// Ties go to the first candidate found.
fn best_fit(blocks: &BlockList, size: usize) -> Option<BlockPtr> {
    let mut best: Option<BlockPtr> = None;

    for block in candidates(blocks, size) {
        if block.size() == size {
            // Can't do better than a perfect fit.
            return Some(block);
        }

        if best.is_none_or(|best| block.size() < best.size()) {
            best = Some(block);
        }
    }

    best
}

/// Ties go to the first candidate found.
fn worst_fit(blocks: &BlockList, size: usize) -> Option<BlockPtr> {
    let mut worst: Option<BlockPtr> = None;

    for block in candidates(blocks, size) {
        if worst.is_none_or(|worst| block.size() > worst.size()) {
            worst = Some(block);
        }
    }

    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{HEADER_SIZE, testing::Scratch};

    // Headers are spaced apart so sizes below HEADER_SIZE can be used
    // without them overlapping; searches never look at addresses.
    const STRIDE: usize = 104;

    /// Builds a list of blocks of the given sizes. `true` marks a used block.
    fn layout(scratch: &mut Scratch, blocks: &[(usize, bool)]) -> (BlockList, Vec<BlockPtr>) {
        let mut list = BlockList::new();
        let mut ptrs = Vec::new();

        for (i, &(size, used)) in blocks.iter().enumerate() {
            let block = scratch.block(i * STRIDE, size, 0);
            block.set_free(!used);
            list.append(block);
            ptrs.push(block);
        }

        (list, ptrs)
    }

    #[test]
    fn parse_names() {
        assert_eq!(FitStrategy::from_name(b"first_fit"), Some(FitStrategy::FirstFit));
        assert_eq!(FitStrategy::from_name(b"best_fit"), Some(FitStrategy::BestFit));
        assert_eq!(FitStrategy::from_name(b"worst_fit"), Some(FitStrategy::WorstFit));
        assert_eq!(FitStrategy::from_name(b"next_fit"), None);
        assert_eq!(FitStrategy::from_name(b""), None);
        assert_eq!(FitStrategy::BestFit.to_string(), "best_fit");
    }

    #[test]
    fn nothing_to_find_in_empty_list() {
        let list = BlockList::new();

        for strategy in [FitStrategy::FirstFit, FitStrategy::BestFit, FitStrategy::WorstFit] {
            assert!(strategy.find(&list, HEADER_SIZE).is_none());
        }
    }

    #[test]
    fn first_fit_skips_used_and_small_blocks() {
        let mut scratch = Scratch::new(STRIDE * 4);
        let (list, blocks) = layout(&mut scratch, &[(512, true), (40, false), (64, false), (512, false)]);

        assert!(FitStrategy::FirstFit.find(&list, 50) == Some(blocks[2]));
        assert!(FitStrategy::FirstFit.find(&list, 65) == Some(blocks[3]));
        assert!(FitStrategy::FirstFit.find(&list, 513).is_none());
    }

    #[test]
    fn best_fit_picks_first_of_equally_good_blocks() {
        let mut scratch = Scratch::new(STRIDE * 3);
        let (list, blocks) = layout(&mut scratch, &[(64, false), (64, false), (200, false)]);

        assert!(FitStrategy::BestFit.find(&list, 50) == Some(blocks[0]));
    }

    #[test]
    fn best_fit_prefers_tightest_block() {
        let mut scratch = Scratch::new(STRIDE * 4);
        let (list, blocks) = layout(&mut scratch, &[(300, false), (96, true), (120, false), (200, false)]);

        assert!(FitStrategy::BestFit.find(&list, 100) == Some(blocks[2]));
    }

    #[test]
    fn best_fit_stops_at_exact_fit() {
        let mut scratch = Scratch::new(STRIDE * 3);
        let (list, blocks) = layout(&mut scratch, &[(300, false), (128, false), (128, false)]);

        assert!(FitStrategy::BestFit.find(&list, 128) == Some(blocks[1]));
    }

    #[test]
    fn best_fit_handles_huge_blocks() {
        let mut scratch = Scratch::new(STRIDE * 2);
        let (list, blocks) = layout(&mut scratch, &[(usize::MAX - 7, false), (1 << 40, false)]);

        assert!(FitStrategy::BestFit.find(&list, 64) == Some(blocks[1]));
    }

    #[test]
    fn worst_fit_picks_largest_block() {
        let mut scratch = Scratch::new(STRIDE * 3);
        let (list, blocks) = layout(&mut scratch, &[(64, false), (512, false), (200, false)]);

        assert!(FitStrategy::WorstFit.find(&list, 50) == Some(blocks[1]));
    }

    #[test]
    fn worst_fit_ties_and_used_blocks() {
        let mut scratch = Scratch::new(STRIDE * 4);
        let (list, blocks) = layout(&mut scratch, &[(900, true), (256, false), (64, false), (256, false)]);

        assert!(FitStrategy::WorstFit.find(&list, 50) == Some(blocks[1]));
        assert!(FitStrategy::WorstFit.find(&list, 257).is_none());
    }

    #[test]
    fn worst_fit_takes_exact_fit() {
        let mut scratch = Scratch::new(STRIDE * 2);
        let (list, blocks) = layout(&mut scratch, &[(128, true), (128, false)]);

        assert!(FitStrategy::WorstFit.find(&list, 128) == Some(blocks[1]));
        assert!(FitStrategy::WorstFit.find(&list, 136).is_none());
    }
}
