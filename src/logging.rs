//! Logging from inside an allocator.
//!
//! Loggers usually allocate to format their records, and when we are the
//! process-wide allocator that allocation comes straight back to us. The
//! allocator never logs while holding its lock, but a logger that allocates
//! would still recurse forever if the nested allocation logged again. The
//! flag below drops log records emitted while this thread is already inside
//! one.

use std::cell::Cell;

thread_local! {
    static LOGGING: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` unless this thread is already logging. During thread teardown,
/// when the flag is gone, records are dropped too.
pub(crate) fn quietly(f: impl FnOnce()) {
    let entered = LOGGING.try_with(|flag| !flag.replace(true)).unwrap_or(false);

    if entered {
        f();
        let _ = LOGGING.try_with(|flag| flag.set(false));
    }
}

macro_rules! heap_log {
    ($level:ident, $($arg:tt)+) => {
        $crate::logging::quietly(|| log::$level!($($arg)+))
    };
}

pub(crate) use heap_log;
