//! Settings come from the environment when the allocator is built with
//! `MemAlloc::new()`. Everything runs in a single test since the
//! environment is shared by the whole process.

use std::{env, slice};

use fitalloc::{FitStrategy, MemAlloc, SCRIBBLE_BYTE};

fn region_lines(allocator: &MemAlloc) -> usize {
    let mut out = String::new();
    allocator.dump(&mut out).unwrap();
    out.lines().filter(|line| line.starts_with("[REGION")).count()
}

#[test]
fn settings_follow_the_environment() {
    unsafe {
        env::remove_var("ALLOCATOR_ALGORITHM");
        env::remove_var("ALLOCATOR_SCRIBBLE");
    }

    let allocator = MemAlloc::new();
    let config = allocator.config();
    assert_eq!(config.strategy, Some(FitStrategy::FirstFit));
    assert!(!config.scribble);

    unsafe { env::set_var("ALLOCATOR_ALGORITHM", "worst_fit") };
    assert_eq!(allocator.config().strategy, Some(FitStrategy::WorstFit));

    // Set but empty is an unknown strategy, not the default.
    unsafe { env::set_var("ALLOCATOR_ALGORITHM", "") };
    assert_eq!(allocator.config().strategy, None);

    // Unknown strategy: every request gets its own region.
    unsafe { env::set_var("ALLOCATOR_ALGORITHM", "quick_fit") };
    let addrs: Vec<_> = (0..4).map(|_| allocator.allocate(16)).collect();
    assert_eq!(region_lines(&allocator), 4);
    for addr in addrs {
        unsafe { allocator.release(addr) };
    }
    assert_eq!(region_lines(&allocator), 0);

    unsafe {
        env::set_var("ALLOCATOR_ALGORITHM", "first_fit");
        env::set_var("ALLOCATOR_SCRIBBLE", "1");
    }
    let addr = allocator.allocate(48);
    assert!(unsafe { slice::from_raw_parts(addr, 48) }.iter().all(|&b| b == SCRIBBLE_BYTE));
    unsafe { allocator.release(addr) };

    unsafe {
        env::remove_var("ALLOCATOR_ALGORITHM");
        env::remove_var("ALLOCATOR_SCRIBBLE");
    }
}
