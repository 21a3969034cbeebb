//! Filesystem boundary
//!
//! The kernel consumes a filesystem it does not implement. This module
//! fixes the interface to it, serializes every call into it, and keeps
//! each process's table of open files.
//!
//! # Design
//! - [`FileSystem`]: the collaborator; not safe under concurrent use
//! - [`FsGuard`]: the single lock every filesystem call goes through
//! - [`FdTable`]: per-process map from small integers to open handles

pub mod fd_table;
pub mod guard;

pub use fd_table::{Fd, FdTable};
pub use guard::FsGuard;

/// The filesystem collaborator.
///
/// Every method takes `&mut self`, so the only way to reach one from
/// several processes is through an [`FsGuard`].
pub trait FileSystem {
    /// Opaque open-file handle, owned by one FD table entry.
    type File;

    /// Create a file of `initial_size` bytes. Returns success.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Remove a file by name. Returns success.
    fn remove(&mut self, name: &str) -> bool;

    /// Open a file by name.
    fn open(&mut self, name: &str) -> Option<Self::File>;

    /// Read at the current position. Returns bytes read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> usize;

    /// Write at the current position. Returns bytes written.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> usize;

    /// Move the position to `pos` bytes from the start.
    fn seek(&mut self, file: &mut Self::File, pos: u32);

    /// Current position in bytes from the start.
    fn tell(&mut self, file: &Self::File) -> u32;

    /// File length in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Close a handle, consuming it.
    fn close(&mut self, file: Self::File);
}
