//! Memory management module for PantherOS
//!
//! Provides:
//! - Kernel heap allocation (bare-metal target)
//! - Address types and the user address range
//! - The address-space interface the syscall layer translates through
//!
//! # Security Principles
//! - User addresses are typed and range-checked
//! - User memory is only reached through a page-table translation
//! - Unsafe code is minimal and audited

pub mod address;
#[cfg(target_os = "none")]
mod allocator;
pub mod paging;

pub use address::{PhysAddr, VirtAddr, PAGE_SIZE};
#[cfg(target_os = "none")]
pub use allocator::{heap_size, init_heap};
pub use paging::{AddressSpace, Mapping, PageFlags};
