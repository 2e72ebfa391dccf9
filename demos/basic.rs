use fitalloc::{Config, FitStrategy, MemAlloc};

fn main() {
    let allocator = MemAlloc::with_config(Config { strategy: Some(FitStrategy::FirstFit), scribble: true });

    let a = allocator.allocate_named(64, "first");
    let b = allocator.allocate(200);
    let c = allocator.allocate_zeroed(16, 8);
    allocator.print_memory();

    unsafe {
        println!("\nReleasing {a:?}, resizing {b:?}");
        allocator.release(a);
        let b = allocator.resize(b, 1000);
        allocator.print_memory();

        allocator.release(b);
        allocator.release(c);
    }

    println!();
    allocator.print_memory();
}
