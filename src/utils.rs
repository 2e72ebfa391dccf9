//! This file contains all the helper functions for the allocator.
//! This are functions that don't particularly belong to any concrete module of the program.

/// It aligns `to_be_aligned` using `aligment`, which must be a power of two.
///
/// This method is used to align region sizes to be a multiple of [`crate::kernel::page_size`]
/// and block sizes to be a multiple of [`crate::block::ALIGNMENT`].
///
/// Returns `None` if the aligned value does not fit in a `usize`.
pub fn align(to_be_aligned: usize, aligment: usize) -> Option<usize> {
    debug_assert!(aligment.is_power_of_two());

    to_be_aligned
        .checked_add(aligment - 1)
        .map(|size| size & !(aligment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_block_size() {
        let aligments = vec![(1..8, 8), (9..16, 16), (17..24, 24), (25..32, 32)];

        for (sizes, expected) in aligments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 8));
            }
        }
    }

    #[test]
    fn align_page_size() {
        // For testing purposes we are assuming the page size is 4096
        let aligments = vec![(1..4096, 4096), (4097..8192, 8192)];

        for (sizes, expected) in aligments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 4096))
            }
        }
    }

    #[test]
    fn align_overflow() {
        assert_eq!(None, align(usize::MAX, 8));
        assert_eq!(None, align(usize::MAX - 3, 8));
        assert_eq!(Some(usize::MAX - 7), align(usize::MAX - 7, 8));
    }
}
