//! User Process Context
//!
//! The per-process state the syscall layer reads and writes, passed
//! explicitly to every operation instead of being fetched from the
//! scheduler's notion of "the current thread".
//!
//! # Ownership
//! - The FD table and exit status are private to the process
//! - The address space is the process's own view of its page tables
//! - Creation, scheduling and waiting are the process manager's job

use alloc::string::String;

use crate::fs::FdTable;
use crate::mm::AddressSpace;

/// A process identifier as returned to user code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Create a process identifier.
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

/// Exit status used for every forced termination.
pub const KILLED: i32 = -1;

/// Process creation and waiting, provided by the process subsystem.
pub trait ProcessManager {
    /// Start a new process running `cmd_line`.
    ///
    /// Returns `None` if the program could not be loaded.
    fn execute(&self, cmd_line: &str) -> Option<Pid>;

    /// Wait for a child to terminate and return its exit status.
    ///
    /// Returns `None` if `pid` is not a direct child, or was already
    /// waited for.
    fn wait(&self, pid: Pid) -> Option<i32>;
}

/// State of one user process, as seen by the syscall layer.
#[derive(Debug)]
pub struct Process<H, A> {
    pid: Pid,
    name: String,
    exit_status: Option<i32>,
    files: FdTable<H>,
    space: A,
}

impl<H, A: AddressSpace> Process<H, A> {
    /// Create the syscall-side state for a freshly loaded process.
    pub fn new(pid: Pid, name: impl Into<String>, space: A) -> Self {
        Self {
            pid,
            name: name.into(),
            exit_status: None,
            files: FdTable::new(),
            space,
        }
    }

    /// Process identifier.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Program name (first word of the command line).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exit status, once the process has terminated.
    #[inline]
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Record the exit status and return the one that stands.
    ///
    /// The first status recorded wins; later calls leave it unchanged.
    pub fn terminate(&mut self, status: i32) -> i32 {
        *self.exit_status.get_or_insert(status)
    }

    /// Check if the process has terminated.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.exit_status.is_some()
    }

    /// Open files.
    #[inline]
    pub fn files(&mut self) -> &mut FdTable<H> {
        &mut self.files
    }

    /// User address space.
    #[inline]
    pub fn space(&self) -> &A {
        &self.space
    }

    /// User address space, for stores into user memory.
    #[inline]
    pub fn space_mut(&mut self) -> &mut A {
        &mut self.space
    }

    /// Split borrow of the open files and the address space.
    #[inline]
    pub fn files_and_space(&mut self) -> (&mut FdTable<H>, &mut A) {
        (&mut self.files, &mut self.space)
    }
}
