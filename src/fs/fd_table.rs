//! File Descriptor Table
//!
//! A per-process map from small integers to open-file handles.
//!
//! # Design
//! - Descriptors 0 and 1 are reserved for the console and never stored
//! - New descriptors come from a counter starting at [`Fd::FIRST`]
//! - The counter only moves forward: a closed descriptor is retired,
//!   never handed out again within the same process

use alloc::collections::BTreeMap;

use super::{FileSystem, FsGuard};

/// A file descriptor as seen by user code.
///
/// This is a newtype so that raw argument words and descriptors cannot
/// be mixed up. Any `i32` is representable; only the table decides
/// whether it names an open file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Console input.
    pub const STDIN: Self = Self(0);

    /// Console output.
    pub const STDOUT: Self = Self(1);

    /// First descriptor handed out by [`FdTable::allocate`].
    pub const FIRST: Self = Self(2);

    /// Create a descriptor from its integer value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the integer value.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// Open files of one process.
///
/// Owned by the process; no locking. Handles are closed through the
/// filesystem guard when released.
#[derive(Debug)]
pub struct FdTable<H> {
    /// Open entries, keyed by descriptor.
    entries: BTreeMap<Fd, H>,
    /// Next descriptor to hand out.
    next_fd: i32,
}

impl<H> FdTable<H> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_fd: Fd::FIRST.0,
        }
    }

    /// Take ownership of `handle` and give it a fresh descriptor.
    pub fn allocate(&mut self, handle: H) -> Fd {
        let fd = Fd(self.next_fd);
        // i32 exhaustion would need two billion opens in one process.
        self.next_fd = self.next_fd.saturating_add(1);
        self.entries.insert(fd, handle);
        fd
    }

    /// Look up an open descriptor.
    ///
    /// Returns `None` for the console descriptors, for descriptors never
    /// allocated and for descriptors already released.
    #[inline]
    pub fn lookup(&mut self, fd: Fd) -> Option<&mut H> {
        self.entries.get_mut(&fd)
    }

    /// Remove an entry without closing it.
    pub fn take(&mut self, fd: Fd) -> Option<H> {
        self.entries.remove(&fd)
    }

    /// Remove an entry and close its handle. No-op if absent.
    pub fn release<F>(&mut self, fd: Fd, guard: &FsGuard<F>)
    where
        F: FileSystem<File = H>,
    {
        if let Some(handle) = self.take(fd) {
            guard.with(|fs| fs.close(handle));
        }
    }

    /// Close every remaining entry, in descriptor order.
    ///
    /// Returns the number of handles closed.
    pub fn release_all<F>(&mut self, guard: &FsGuard<F>) -> usize
    where
        F: FileSystem<File = H>,
    {
        let entries = core::mem::take(&mut self.entries);
        let count = entries.len();
        for (_, handle) in entries {
            guard.with(|fs| fs.close(handle));
        }
        count
    }

    /// Number of open entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no files are open.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor the next `allocate` will return.
    #[inline]
    pub fn next_fd(&self) -> Fd {
        Fd(self.next_fd)
    }
}

impl<H> Default for FdTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
