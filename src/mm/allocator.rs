//! Kernel Heap Allocator
//!
//! Uses `linked_list_allocator` for heap management. The FD tables,
//! process names and syscall bounce buffers all live on this heap.
//!
//! # Security Considerations
//! - Heap is initialized once during boot
//! - All allocations go through Rust's global allocator
//! - linked_list_allocator provides bounds checking

use linked_list_allocator::LockedHeap;

/// Global heap allocator instance
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Heap size (1 MiB: user reads and writes are bounced through it)
const HEAP_SIZE: usize = 1024 * 1024;

/// Static heap memory region
static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initialize the kernel heap
///
/// Must run exactly once during kernel initialization, before any
/// heap allocation is made.
///
/// SAFETY AUDIT: 2025-01-04
/// - Called once from `crate::init`
/// - HEAP_MEMORY is a static, valid memory region
/// - linked_list_allocator handles internal safety
pub fn init_heap() {
    // SAFETY:
    // - HEAP_MEMORY is a valid static array
    // - This function is only called once during boot
    // - No other code accesses HEAP_MEMORY directly
    unsafe {
        let heap_start = (&raw mut HEAP_MEMORY).cast::<u8>();
        ALLOCATOR.lock().init(heap_start, HEAP_SIZE);
    }
}

/// Get the size of the kernel heap
pub fn heap_size() -> usize {
    HEAP_SIZE
}
