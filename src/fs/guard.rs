//! Filesystem Access Guard
//!
//! One `spin::Mutex` around the filesystem collaborator. Every call is
//! made inside [`FsGuard::with`], which holds the lock for exactly the
//! duration of the closure and releases it when the closure returns,
//! whatever it returns.
//!
//! # Concurrency
//! - Plain mutual exclusion, no reader/writer split, no timeout
//! - A process blocked here spins until the holder releases
//! - The closure receives `&mut F`, not the guard, so it cannot
//!   re-enter the lock through this type

use spin::Mutex;

use super::FileSystem;

/// Serializes all access to a [`FileSystem`].
#[derive(Debug)]
pub struct FsGuard<F> {
    fs: Mutex<F>,
}

impl<F: FileSystem> FsGuard<F> {
    /// Wrap a filesystem.
    pub const fn new(fs: F) -> Self {
        Self { fs: Mutex::new(fs) }
    }

    /// Run one filesystem operation under the lock.
    ///
    /// The lock guard is dropped on return from `op`, so the release
    /// happens on every path, including early returns inside `op`.
    pub fn with<R>(&self, op: impl FnOnce(&mut F) -> R) -> R {
        let mut fs = self.fs.lock();
        op(&mut fs)
    }

    /// Consume the guard and return the filesystem.
    pub fn into_inner(self) -> F {
        self.fs.into_inner()
    }
}
