//! Uses the allocator twice: as the `#[global_allocator]` behind every std
//! collection in this program, and as standalone heaps pinned to each fit
//! strategy to show which hole each one picks.
//!
//! Try it with `ALLOCATOR_ALGORITHM=best_fit` to change the global one.

use std::{collections::HashMap, thread};

use fitalloc::{Config, FitStrategy, MemAlloc};

#[global_allocator]
static ALLOCATOR: MemAlloc = MemAlloc::new();

/// Leaves free holes of 200, 3000 and 64 bytes, kept apart by used blocks so
/// they can't merge, then serves a 50 byte request.
fn pick_hole(strategy: FitStrategy) {
    let heap = MemAlloc::with_config(Config { strategy: Some(strategy), scribble: false });

    let holes: Vec<_> = [200, 3000, 64]
        .into_iter()
        .map(|size| (size, heap.allocate(size), heap.allocate_named(8, "fence")))
        .collect();

    for &(_, hole, _) in &holes {
        unsafe { heap.release(hole) };
    }

    let addr = heap.allocate_named(50, "request");
    let picked = holes.iter().find(|&&(_, hole, _)| hole == addr).map(|&(size, ..)| size);

    match picked {
        Some(size) => println!("{strategy}: 50 bytes went to the {size} byte hole"),
        None => println!("{strategy}: 50 bytes went to the free tail of the region at {addr:p}"),
    }
    heap.print_memory();

    unsafe {
        heap.release(addr);
        for (_, _, fence) in holes {
            heap.release(fence);
        }
    }
}

fn main() {
    let mut words: HashMap<&str, usize> = HashMap::new();
    for word in "the quick brown fox jumps over the lazy dog the end".split(' ') {
        *words.entry(word).or_default() += 1;
    }
    println!("'the' seen {} times, map at {:p}", words["the"], &words);

    let mut squares = Vec::new();
    for i in 0..8u64 {
        squares.push(i * i);
    }
    println!("{} squares, capacity {} at {:p}", squares.len(), squares.capacity(), squares.as_ptr());

    let workers: Vec<_> = (0..4).map(|i| thread::spawn(move || format!("worker {i}").repeat(i + 1))).collect();
    for worker in workers {
        println!("{}", worker.join().unwrap());
    }

    println!();
    for strategy in [FitStrategy::FirstFit, FitStrategy::BestFit, FitStrategy::WorstFit] {
        pick_hole(strategy);
        println!();
    }

    ALLOCATOR.print_memory();
}
