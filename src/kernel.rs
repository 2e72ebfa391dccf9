use std::{
    ffi::CStr,
    fmt, io,
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Virtual memory page size of the computer. This is usually 4096.
/// This value should be a constant, but we can't do that since we
/// don't know the value at compile time, so it is cached on first use.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// Platform handle. The allocator never talks to the OS directly, it goes
/// through the [`PlatformMemory`] implementation of this type.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. As the allocator, our top level view of this, has nothing
/// to do with the concrete implementations / APIs offered by each kernel.
///
/// None of these may allocate: they run while the heap lock is held, and
/// possibly on behalf of the process-wide allocator.
trait PlatformMemory {
    /// Request a zeroed memory region of size `len`. It returns a Pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize) -> bool;

    /// Returns the virtual memory page size of the computer in bytes.
    fn page_size() -> usize;

    /// Looks up the environment variable `key` and hands its raw value to `f`.
    fn env_var<R>(key: &CStr, f: impl FnOnce(Option<&[u8]>) -> R) -> R;

    /// Unbuffered write to the standard output.
    fn write_stdout(bytes: &[u8]);
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub(crate) fn page_size() -> usize {
    match PAGE_SIZE.load(Ordering::Relaxed) {
        0 => {
            let size = Kernel::page_size();
            PAGE_SIZE.store(size, Ordering::Relaxed);
            size
        }
        size => size,
    }
}

/// Wrapper to use [`Kernel::request_memory`]. On failure returns the OS error code.
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Result<NonNull<u8>, i32> {
    unsafe { Kernel::request_memory(len).ok_or_else(last_error) }
}

/// Wrapper to use [`Kernel::return_memory`]. On failure returns the OS error code.
#[inline]
pub(crate) unsafe fn return_memory(addr: NonNull<u8>, len: usize) -> Result<(), i32> {
    match unsafe { Kernel::return_memory(addr, len) } {
        true => Ok(()),
        false => Err(last_error()),
    }
}

/// Wrapper to use [`Kernel::env_var`].
#[inline]
pub(crate) fn env_var<R>(key: &CStr, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
    Kernel::env_var(key, f)
}

fn last_error() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// [`fmt::Write`] sink over the raw standard output. Unlike `std::io::stdout`
/// it has no buffer to allocate.
pub(crate) struct Stdout;

impl fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Kernel::write_stdout(s.as_bytes());
        Ok(())
    }
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        ffi::CStr,
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            // Anonymous mappings come back zero filled.
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                match mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET) {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) -> bool {
            unsafe { munmap(addr.as_ptr().cast::<c_void>(), len as size_t) == 0 }
        }

        fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }

        fn env_var<R>(key: &CStr, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
            unsafe {
                let value = libc::getenv(key.as_ptr());

                if value.is_null() {
                    f(None)
                } else {
                    f(Some(CStr::from_ptr(value).to_bytes()))
                }
            }
        }

        fn write_stdout(mut bytes: &[u8]) {
            while !bytes.is_empty() {
                let written = unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len()) };
                if written <= 0 {
                    return;
                }
                bytes = &bytes[written as usize..];
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{ffi::CStr, mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use crate::kernel::{Kernel, PlatformMemory};

    use windows::{
        Win32::{
            Foundation::{ERROR_ENVVAR_NOT_FOUND, ERROR_SUCCESS, GetLastError, SetLastError},
            Storage::FileSystem,
            System::{Console, Environment, Memory, SystemInformation},
        },
        core::PCSTR,
    };

    /// Longest environment value we care about. Anything longer can't be
    /// one of our settings anyway.
    const ENV_BUFFER: usize = 64;

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) -> bool {
            unsafe { Memory::VirtualFree(addr.as_ptr() as *mut c_void, 0, Memory::MEM_RELEASE).is_ok() }
        }

        fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }

        fn env_var<R>(key: &CStr, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
            let mut buffer = [0u8; ENV_BUFFER];

            // A variable set to the empty string also returns 0, only the last
            // error tells it apart from a missing one.
            let (len, missing) = unsafe {
                SetLastError(ERROR_SUCCESS);
                let len = Environment::GetEnvironmentVariableA(PCSTR(key.as_ptr().cast()), Some(&mut buffer));
                (len as usize, GetLastError() == ERROR_ENVVAR_NOT_FOUND)
            };

            match len {
                0 if missing => f(None),
                0 => f(Some(&[])),
                // Did not fit: the returned length is the size it would need.
                len if len >= ENV_BUFFER => f(Some(&[])),
                len => f(Some(&buffer[..len])),
            }
        }

        fn write_stdout(bytes: &[u8]) {
            unsafe {
                if let Ok(handle) = Console::GetStdHandle(Console::STD_OUTPUT_HANDLE) {
                    let _ = FileSystem::WriteFile(handle, Some(bytes), None, None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_cached_power_of_two() {
        let size = page_size();

        assert!(size.is_power_of_two());
        assert!(size >= 4096);
        assert_eq!(size, page_size());
    }

    #[test]
    fn requested_memory_is_zeroed_and_writable() {
        let len = 2 * page_size();

        unsafe {
            let addr = request_memory(len).expect("mmap failed");
            let bytes = std::slice::from_raw_parts_mut(addr.as_ptr(), len);

            assert!(bytes.iter().all(|&b| b == 0));
            bytes.fill(0x5A);
            assert_eq!(bytes[len - 1], 0x5A);

            assert_eq!(return_memory(addr, len), Ok(()));
        }
    }

    #[test]
    fn missing_env_var() {
        let seen = env_var(c"FITALLOC_SURELY_NOT_SET", |value| value.map(<[u8]>::to_vec));
        assert_eq!(seen, None);
    }

    #[test]
    fn empty_env_var_is_set() {
        unsafe { std::env::set_var("FITALLOC_EMPTY_VAR", "") };

        let seen = env_var(c"FITALLOC_EMPTY_VAR", |value| value.map(<[u8]>::to_vec));
        assert_eq!(seen, Some(Vec::new()));

        unsafe { std::env::remove_var("FITALLOC_EMPTY_VAR") };
    }
}
