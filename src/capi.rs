//! C memory API, exported when the `capi` feature is enabled.
//!
//! Build the crate as a `cdylib` and preload it to make every program use it:
//!
//! ```text
//! cargo build --release --features capi
//! LD_PRELOAD=$(pwd)/target/release/libfitalloc.so command
//! ```
//!
//! Everything goes through one process-wide [`MemAlloc`], configured through
//! the environment. It lives for the whole process and is never torn down.

use std::{
    ffi::{CStr, c_char, c_void},
    ptr::NonNull,
};

use crate::{MemAlloc, block::Name};

static ALLOCATOR: MemAlloc = MemAlloc::new();

#[unsafe(no_mangle)]
pub extern "C" fn malloc(size: usize) -> *mut c_void {
    ALLOCATOR.allocate(size).cast()
}

/// `malloc` that labels the block with `name` in [`print_memory`].
///
/// # Safety
///
/// `name` must be null or a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc_name(size: usize, name: *const c_char) -> *mut c_void {
    let name = NonNull::new(name.cast_mut()).map(|name| {
        let label = unsafe { CStr::from_ptr(name.as_ptr()) };
        Name::from_bytes(label.to_bytes())
    });

    ALLOCATOR.allocate_as(size, name).cast()
}

#[unsafe(no_mangle)]
pub extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    ALLOCATOR.allocate_zeroed(nmemb, size).cast()
}

/// # Safety
///
/// `ptr` must be null or come from this allocator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    unsafe { ALLOCATOR.resize(ptr.cast(), size).cast() }
}

/// # Safety
///
/// `ptr` must be null or come from this allocator.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    unsafe { ALLOCATOR.release(ptr.cast()) }
}

/// Prints every region and block to the standard output.
#[unsafe(no_mangle)]
pub extern "C" fn print_memory() {
    ALLOCATOR.print_memory();
}
