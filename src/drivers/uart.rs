//! PL011 UART Driver for QEMU virt machine
//!
//! Serial console: descriptor 0 reads from it, descriptor 1 and the
//! kernel log write to it.
//!
//! # Memory Map (QEMU virt)
//! - Base address: 0x0900_0000
//! - Register size: 0x1000 bytes
//!
//! # Security Considerations
//! - Unsafe code is limited to the two MMIO accessors
//! - Uses spinlock for thread-safe access

use core::fmt::{self, Write};
use spin::Mutex;

use super::console::Console;

/// QEMU virt machine PL011 UART base address
const UART_BASE: usize = 0x0900_0000;

/// PL011 Register offsets
mod regs {
    /// Data Register - read/write data
    pub const DR: usize = 0x00;
    /// Flag Register - status flags
    pub const FR: usize = 0x18;
}

/// Flag Register bits
mod flags {
    /// Receive FIFO empty
    pub const RXFE: u32 = 1 << 4;
    /// Transmit FIFO full
    pub const TXFF: u32 = 1 << 5;
}

/// PL011 UART driver
pub struct Uart {
    base: usize,
    initialized: bool,
}

impl Uart {
    /// Create a new UART instance (not yet initialized)
    pub const fn new(base: usize) -> Self {
        Self {
            base,
            initialized: false,
        }
    }

    /// Initialize the UART
    ///
    /// # Safety
    /// - Must only be called once
    /// - UART base address must be valid and mapped
    pub unsafe fn init(&mut self) {
        // PL011 is already initialized by QEMU, just mark as ready
        self.initialized = true;
    }

    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        // SAFETY: only reachable after init(), which the caller promised
        // happens with a valid, mapped base. FR and DR are 32-bit registers.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        // SAFETY: see read_reg
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    /// Write a single byte to the UART
    fn write_byte(&self, byte: u8) {
        if !self.initialized {
            return;
        }

        while self.read_reg(regs::FR) & flags::TXFF != 0 {
            core::hint::spin_loop();
        }
        self.write_reg(regs::DR, byte as u32);
    }

    /// Block until a byte arrives and return it
    ///
    /// An uninitialized UART reads as a stream of NUL bytes.
    fn read_byte(&self) -> u8 {
        if !self.initialized {
            return 0;
        }

        while self.read_reg(regs::FR) & flags::RXFE != 0 {
            core::hint::spin_loop();
        }
        (self.read_reg(regs::DR) & 0xFF) as u8
    }

    /// Write raw bytes, translating `\n` to `\r\n`
    pub fn write_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    /// Write a string to the UART
    pub fn write_str(&self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Uart::write_str(self, s);
        Ok(())
    }
}

/// Global UART instance protected by spinlock
pub static UART: Mutex<Uart> = Mutex::new(Uart::new(UART_BASE));

/// The global UART as the user console.
#[derive(Debug, Default, Clone, Copy)]
pub struct UartConsole;

impl Console for UartConsole {
    fn getc(&self) -> u8 {
        UART.lock().read_byte()
    }

    fn putbuf(&self, buf: &[u8]) {
        // One lock for the whole buffer keeps user output contiguous.
        UART.lock().write_bytes(buf);
    }
}

/// Print macro for kernel output
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut uart = $crate::drivers::uart::UART.lock();
        let _ = write!(uart, $($arg)*);
    }};
}

/// Println macro for kernel output
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}
