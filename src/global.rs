//! [`GlobalAlloc`] implementation, so a [`MemAlloc`] can be registered with
//! `#[global_allocator]`.
//!
//! Payloads sit right after a 100 byte header, which only guarantees
//! [`PAYLOAD_ALIGN`]. Layouts asking for more get a bigger block, and the
//! returned pointer is moved forward to the next aligned address. The distance
//! moved is stored in the word just before that pointer:
//!
//! ```text
//! +--------+-----------------------------+--------+-----------------------+
//! | Header |     padding (unused)        | offset | aligned user memory   |
//! +--------+-----------------------------+--------+-----------------------+
//!          ^ payload                              ^ returned pointer
//!          <------------- offset ---------------->
//! ```

use std::{
    alloc::{GlobalAlloc, Layout},
    mem, ptr,
};

use crate::{MemAlloc, block::PAYLOAD_ALIGN};

const OFFSET_SIZE: usize = mem::size_of::<usize>();

#[inline]
fn is_over_aligned(layout: Layout) -> bool {
    layout.align() > PAYLOAD_ALIGN
}

impl MemAlloc {
    unsafe fn alloc_over_aligned(&self, layout: Layout) -> *mut u8 {
        let Some(size) = layout.size().checked_add(layout.align() + OFFSET_SIZE) else {
            return ptr::null_mut();
        };

        let payload = self.allocate(size);
        if payload.is_null() {
            return payload;
        }

        unsafe {
            let offset = (payload.add(OFFSET_SIZE) as usize).next_multiple_of(layout.align()) - payload as usize;
            let aligned = payload.add(offset);
            aligned.sub(OFFSET_SIZE).cast::<usize>().write_unaligned(offset);
            aligned
        }
    }

    unsafe fn dealloc_over_aligned(&self, ptr: *mut u8) {
        unsafe {
            let offset = ptr.sub(OFFSET_SIZE).cast::<usize>().read_unaligned();
            self.release(ptr.sub(offset));
        }
    }
}

unsafe impl GlobalAlloc for MemAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if is_over_aligned(layout) {
            unsafe { self.alloc_over_aligned(layout) }
        } else {
            self.allocate(layout.size())
        }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.alloc(layout) };
        if !ptr.is_null() {
            unsafe { ptr.write_bytes(0, layout.size()) };
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if is_over_aligned(layout) {
            unsafe { self.dealloc_over_aligned(ptr) }
        } else {
            unsafe { self.release(ptr) }
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if is_over_aligned(layout) {
            let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
                return ptr::null_mut();
            };

            unsafe {
                let new = self.alloc_over_aligned(new_layout);
                if !new.is_null() {
                    ptr::copy_nonoverlapping(ptr, new, layout.size().min(new_size));
                    self.dealloc_over_aligned(ptr);
                }
                new
            }
        } else {
            unsafe { self.resize(ptr, new_size) }
        }
    }
}
