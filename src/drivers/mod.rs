//! Device drivers for PantherOS
//!
//! All drivers follow these security principles:
//! - Minimal unsafe code, well-documented
//! - Input validation on all public interfaces
//! - No panics on invalid input (return errors)

pub mod console;
pub mod power;
pub mod uart;

pub use console::Console;
pub use power::{Machine, Psci};
pub use uart::UartConsole;
