//! PantherOS - User Program System-Call Boundary
//!
//! The layer between untrusted EL0 processes and kernel services: it
//! decodes and validates every system call, routes it to one handler,
//! keeps each process's open files and serializes access to the shared
//! filesystem.
//!
//! # Security Features
//! - No user pointer is dereferenced; user memory is reached only
//!   through a page-table translation of the caller's address space
//! - Every page a user buffer spans is checked before use
//! - Bad input ends the offending process (status -1), never the kernel
//! - One lock around the filesystem, released on every path
//!
//! # Architecture
//! - Target: AArch64 (ARM64), QEMU virt machine
//! - Trap: `svc #0x30`, arguments on the user stack
//! - Collaborators (filesystem, process manager, VM, console, power)
//!   are traits; host unit tests drive the layer through fakes

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod exception;
pub mod fs;
pub mod logging;
pub mod mm;
pub mod process;
pub mod syscall;

#[cfg(test)]
mod testing;

pub use exception::{handle_sync_lower_el, ExceptionContext, TrapOutcome};
pub use syscall::{Kernel, SyscallOutcome};

/// Kernel version string
pub const VERSION: &str = "0.3.0";

/// Bring up the pieces the syscall layer relies on.
///
/// Called once from the boot path, after the MMU is on and before the
/// first user process is started.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub fn init(level: log::LevelFilter) {
    // SAFETY: UART address is fixed by the QEMU virt memory map,
    // and this is the only call site.
    unsafe {
        drivers::uart::UART.lock().init();
    }

    mm::init_heap();
    // A second install only happens if init runs twice; keep the first.
    let _ = logging::init(level);
    log::info!("[BOOT] PantherOS userprog v{}", VERSION);
    log::info!("[BOOT] Heap initialized ({} KiB)", mm::heap_size() / 1024);

    exception::init();
}

/// Panic handler - called on unrecoverable kernel errors
///
/// User input never reaches this; a panic here is a kernel bug.
#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    kprintln!();
    kprintln!("!!! KERNEL PANIC !!!");
    if let Some(location) = info.location() {
        kprintln!(
            "Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    kprintln!("Message: {}", info.message());
    kprintln!("System halted.");

    loop {
        core::hint::spin_loop();
    }
}
