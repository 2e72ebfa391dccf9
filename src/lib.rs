//! # fitalloc
//!
//! A general purpose memory allocator built directly on top of virtual memory
//! regions (`mmap` on unix, `VirtualAlloc` on windows) instead of the platform
//! allocator.
//!
//! Every allocation is a block prefixed by a fixed 100 byte header. Blocks are
//! carved out of page-sized regions and all of them, across all regions, are
//! threaded in a single doubly linked list:
//!
//! ```text
//!  region 0                                       region 1
//! +----------------------------------------+     +---------------------------+
//! | +--------+------+    +--------+------+ |     | +--------+--------------+ |
//! | | header | data | <> | header | free | | <-> | | header |     data     | |
//! | +--------+------+    +--------+------+ |     | +--------+--------------+ |
//! +----------------------------------------+     +---------------------------+
//! ```
//!
//! - Requests are served from a free block picked by a [`FitStrategy`]
//!   (first, best or worst fit), or from a freshly mapped region.
//! - Oversized free blocks are split, the remainder stays free.
//! - Freed blocks are merged with their free neighbours of the same region,
//!   and a region is unmapped as soon as nothing in it is in use.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fitalloc::{Config, FitStrategy, MemAlloc};
//!
//! let allocator = MemAlloc::with_config(Config { strategy: Some(FitStrategy::BestFit), scribble: false });
//!
//! let addr = allocator.allocate_named(64, "scratch");
//! assert!(!addr.is_null());
//! allocator.print_memory();
//! unsafe { allocator.release(addr) };
//! ```
//!
//! Or as the process-wide allocator:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOCATOR: fitalloc::MemAlloc = fitalloc::MemAlloc::new();
//! ```
//!
//! [`MemAlloc::new`] reads the `ALLOCATOR_ALGORITHM` (`first_fit`, `best_fit`,
//! `worst_fit`) and `ALLOCATOR_SCRIBBLE` (`1` to fill new memory with `0xAA`)
//! environment variables on every allocation.

mod logging;

mod allocator;
mod block;
mod config;
mod dump;
mod error;
mod fit;
mod global;
mod heap;
mod kernel;
mod list;
mod region;
mod utils;

#[cfg(feature = "capi")]
pub mod capi;

pub use allocator::MemAlloc;
pub use block::{HEADER_SIZE, PAYLOAD_ALIGN};
pub use config::{Config, SCRIBBLE_BYTE, SCRIBBLE_VAR, STRATEGY_VAR};
pub use fit::FitStrategy;
