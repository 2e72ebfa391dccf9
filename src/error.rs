//! Errors of the allocator.
//!
//! None of these ever reach the caller of the allocation API: the facade
//! logs them and turns them into a null pointer, as any `malloc` would.

use std::{fmt, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The requested size overflows once the header and alignment are added.
    SizeOverflow { size: usize },
    /// The OS refused to map a new region.
    MapFailed { len: usize, code: i32 },
    /// The OS refused to unmap a region. The region is already unlinked, so
    /// its range is lost to the allocator.
    UnmapFailed { addr: usize, len: usize, code: i32 },
}

impl AllocError {
    /// Whether the allocator may be in an inconsistent state after this.
    pub(crate) fn is_fatal(&self) -> bool {
        matches!(self, Self::UnmapFailed { .. })
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SizeOverflow { size } => write!(f, "request of {size} bytes overflows"),
            Self::MapFailed { len, code } => {
                write!(f, "mmap of {len} bytes failed: {}", io::Error::from_raw_os_error(code))
            }
            Self::UnmapFailed { addr, len, code } => write!(
                f,
                "munmap of {len} bytes at {addr:#x} failed: {}",
                io::Error::from_raw_os_error(code)
            ),
        }
    }
}

impl std::error::Error for AllocError {}

pub type AllocResult<T> = Result<T, AllocError>;
