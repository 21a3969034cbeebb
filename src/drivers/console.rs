//! Console streams behind descriptors 0 and 1
//!
//! The syscall layer never touches a device directly: console input is
//! consumed byte by byte and console output is handed over in one piece,
//! both through this trait.

/// A byte-oriented console.
///
/// Methods take `&self`; implementations serialize device access
/// themselves (the UART sits behind its own spinlock).
pub trait Console {
    /// Block until one input byte is available and return it.
    fn getc(&self) -> u8;

    /// Write a whole buffer without interleaving other output.
    fn putbuf(&self, buf: &[u8]);
}
