use std::ffi::CStr;

use crate::{fit::FitStrategy, kernel};

/// Selects the [`FitStrategy`]: `first_fit` (default), `best_fit` or `worst_fit`.
pub const STRATEGY_VAR: &CStr = c"ALLOCATOR_ALGORITHM";

/// When set to exactly `1`, freshly returned memory is filled with [`SCRIBBLE_BYTE`].
pub const SCRIBBLE_VAR: &CStr = c"ALLOCATOR_SCRIBBLE";

/// Pattern written over new allocations when scribbling is on, so reads of
/// uninitialized memory stand out.
pub const SCRIBBLE_BYTE: u8 = 0xAA;

/// Allocator settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// How free blocks are picked for reuse. `None` when the setting named an
    /// unknown strategy, in which case nothing is ever reused and every
    /// request maps a new region.
    pub strategy: Option<FitStrategy>,
    /// Fill new allocations with [`SCRIBBLE_BYTE`].
    pub scribble: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Some(FitStrategy::FirstFit),
            scribble: false,
        }
    }
}

impl Config {
    /// Builds the settings from the raw values of [`STRATEGY_VAR`] and
    /// [`SCRIBBLE_VAR`], `None` meaning the variable is not set.
    pub fn parse(strategy: Option<&[u8]>, scribble: Option<&[u8]>) -> Self {
        Self {
            strategy: match strategy {
                None => Some(FitStrategy::FirstFit),
                Some(name) => FitStrategy::from_name(name),
            },
            scribble: matches!(scribble, Some(b"1")),
        }
    }

    /// Reads the settings from the process environment.
    ///
    /// This does not allocate, so it is safe to call from inside the allocator.
    pub fn from_env() -> Self {
        kernel::env_var(STRATEGY_VAR, |strategy| {
            kernel::env_var(SCRIBBLE_VAR, |scribble| Self::parse(strategy, scribble))
        })
    }
}
