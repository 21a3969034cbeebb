//! System call error classes
//!
//! Two classes are fatal to the calling process and two are reported
//! back to it. The dispatcher is the only place that acts on the
//! difference.

use core::fmt;

/// Why a system call did not complete normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// A user pointer is outside the user range, unmapped, or names a
    /// read-only page the kernel was asked to write.
    InvalidAddress,
    /// The syscall number is not in the dispatch table.
    InvalidSyscallNumber,
    /// A descriptor or file lookup missed.
    ResourceNotFound,
    /// A collaborator refused the operation, or an argument it would be
    /// handed is unusable.
    OperationFailure,
}

impl SyscallError {
    /// Check if this error terminates the calling process.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InvalidAddress | Self::InvalidSyscallNumber)
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress => write!(f, "invalid user address"),
            Self::InvalidSyscallNumber => write!(f, "invalid system call number"),
            Self::ResourceNotFound => write!(f, "no such file or descriptor"),
            Self::OperationFailure => write!(f, "operation failed"),
        }
    }
}

/// Result type for syscall internals.
pub type SysResult<T> = Result<T, SyscallError>;
