use std::{fmt, ptr, ptr::NonNull};

use spin::Mutex;

use crate::{
    block::Name,
    config::{Config, SCRIBBLE_BYTE},
    dump,
    heap::{Heap, Released},
    kernel,
    logging::heap_log,
};

/// Where a [`MemAlloc`] takes its settings from.
#[derive(Clone, Copy)]
enum Settings {
    /// Re-read the process environment on every allocation.
    Environment,
    Fixed(Config),
}

/// General purpose allocator serving every request from its own `mmap`ed
/// regions.
///
/// All the bookkeeping lives in a single [`Heap`] behind a spin lock, so any
/// number of threads may allocate and release at once. The lock only covers
/// list work and the `mmap`/`munmap` calls themselves: filling, copying and
/// logging happen after it is dropped. This is what lets a `MemAlloc` be the
/// process-wide allocator, see [`crate::global`].
///
/// Errors never reach the caller, like `malloc` every failure turns into a
/// null pointer after being logged.
pub struct MemAlloc {
    heap: Mutex<Heap>,
    settings: Settings,
}

impl MemAlloc {
    /// Creates an allocator configured through the `ALLOCATOR_ALGORITHM` and
    /// `ALLOCATOR_SCRIBBLE` environment variables, read on every allocation.
    pub const fn new() -> Self {
        Self {
            heap: Mutex::new(Heap::new()),
            settings: Settings::Environment,
        }
    }

    /// Creates an allocator that ignores the environment.
    pub const fn with_config(config: Config) -> Self {
        Self {
            heap: Mutex::new(Heap::new()),
            settings: Settings::Fixed(config),
        }
    }

    /// Settings the next allocation will use.
    pub fn config(&self) -> Config {
        match self.settings {
            Settings::Environment => Config::from_env(),
            Settings::Fixed(config) => config,
        }
    }

    /// Allocates `size` bytes, returning null if no memory could be mapped.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        self.allocate_as(size, None)
    }

    /// Same as [`MemAlloc::allocate`] but the block shows up as `name` in
    /// [`MemAlloc::dump`]. Names longer than 31 bytes are cut.
    pub fn allocate_named(&self, size: usize, name: &str) -> *mut u8 {
        self.allocate_as(size, Some(Name::from_label(name)))
    }

    pub(crate) fn allocate_as(&self, size: usize, name: Option<Name>) -> *mut u8 {
        let config = self.config();

        let grant = {
            let mut heap = self.heap.lock();
            heap.allocate(size, config.strategy).inspect(|grant| {
                if let Some(name) = name {
                    grant.block.set_name(name);
                }
            })
        };

        match grant {
            Ok(grant) => {
                let payload = grant.block.payload();

                if let Some(id) = grant.mapped {
                    heap_log!(debug, "mapped region {id} of {} bytes at {:#x}", grant.block.size(), grant.block.addr());
                }
                if config.scribble {
                    unsafe { payload.write_bytes(SCRIBBLE_BYTE, size) };
                }

                heap_log!(trace, "allocate({size}) -> {:p}", payload);
                payload.as_ptr()
            }
            Err(error) => {
                heap_log!(warn, "allocate({size}) failed: {error}");
                ptr::null_mut()
            }
        }
    }

    /// Allocates a zero filled array of `count` elements of `size` bytes.
    ///
    /// Returns null if `count * size` overflows or no memory could be mapped.
    pub fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(size) else {
            heap_log!(warn, "allocate_zeroed({count}, {size}) failed: size overflows");
            return ptr::null_mut();
        };

        let addr = self.allocate(total);
        if !addr.is_null() {
            // Reused blocks still hold whatever their last owner wrote.
            unsafe { addr.write_bytes(0, total) };
        }

        addr
    }

    /// Gives back memory obtained from this allocator. Null is ignored.
    ///
    /// # Safety
    ///
    /// `addr` must be null or a live pointer returned by this allocator.
    pub unsafe fn release(&self, addr: *mut u8) {
        let Some(payload) = NonNull::new(addr) else {
            return;
        };

        let released = unsafe { self.heap.lock().release(payload) };

        match released {
            Ok(Released::Block { size }) => heap_log!(trace, "release({:p}) -> {size} bytes free", payload),
            Ok(Released::Region { id, len }) => {
                heap_log!(trace, "release({:p})", payload);
                heap_log!(debug, "unmapped region {id} of {len} bytes");
            }
            Err(error) if error.is_fatal() => heap_log!(error, "release({:p}) left the heap inconsistent: {error}", payload),
            Err(error) => heap_log!(warn, "release({:p}) failed: {error}", payload),
        }
    }

    /// Moves the allocation at `addr` to a new block of `size` bytes.
    ///
    /// A null `addr` behaves like [`MemAlloc::allocate`]. A zero `size` behaves
    /// like [`MemAlloc::release`] and returns null. Otherwise the contents are
    /// copied over to a new block, up to the smaller of both sizes, and the old
    /// block is released. The block is never resized in place. If the new block
    /// can't be allocated null is returned and `addr` stays valid.
    ///
    /// # Safety
    ///
    /// `addr` must be null or a live pointer returned by this allocator.
    pub unsafe fn resize(&self, addr: *mut u8, size: usize) -> *mut u8 {
        let Some(old) = NonNull::new(addr) else {
            return self.allocate(size);
        };

        if size == 0 {
            unsafe { self.release(addr) };
            return ptr::null_mut();
        }

        let capacity = unsafe { self.heap.lock().capacity(old) };

        let new = self.allocate(size);
        if new.is_null() {
            return new;
        }

        unsafe {
            ptr::copy_nonoverlapping(old.as_ptr(), new, capacity.min(size));
            self.release(addr);
        }

        heap_log!(trace, "resize({:p}, {size}) -> {:p}", old, new);
        new
    }

    /// Renames a live allocation.
    ///
    /// # Safety
    ///
    /// `addr` must be a live pointer returned by this allocator.
    pub unsafe fn rename(&self, addr: NonNull<u8>, name: &str) {
        unsafe { self.heap.lock().rename(addr, Name::from_label(name)) }
    }

    /// Writes every region and block, in list order, to `out`.
    ///
    /// The heap stays locked while writing, so `out` must not allocate through
    /// this same allocator. When this is the process-wide allocator use
    /// [`MemAlloc::print_memory`] instead.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        dump::write_memory(&self.heap.lock().blocks, out)
    }

    /// Prints the memory state to the standard output, see [`MemAlloc::dump`].
    pub fn print_memory(&self) {
        let _ = self.dump(&mut kernel::Stdout);
    }
}

impl Default for MemAlloc {
    fn default() -> Self {
        Self::new()
    }
}
