//! System call numbers
//!
//! Numbering follows the Pintos user library, so unmodified Pintos test
//! programs trap with the numbers this table expects. Numbers past
//! `Close` belong to later Pintos projects and are not served here.

use super::error::SyscallError;

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

/// Largest argument count of any system call.
pub const MAX_ARGS: usize = 3;

/// Every request the dispatcher serves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum SyscallKind {
    /// Power the machine off.
    Halt = numbers::SYS_HALT,
    /// Terminate the calling process with a status.
    Exit = numbers::SYS_EXIT,
    /// Start a new process from a command line.
    Exec = numbers::SYS_EXEC,
    /// Wait for a child process.
    Wait = numbers::SYS_WAIT,
    /// Create a file.
    Create = numbers::SYS_CREATE,
    /// Remove a file.
    Remove = numbers::SYS_REMOVE,
    /// Open a file.
    Open = numbers::SYS_OPEN,
    /// Size of an open file.
    Filesize = numbers::SYS_FILESIZE,
    /// Read from a descriptor.
    Read = numbers::SYS_READ,
    /// Write to a descriptor.
    Write = numbers::SYS_WRITE,
    /// Move a file position.
    Seek = numbers::SYS_SEEK,
    /// Report a file position.
    Tell = numbers::SYS_TELL,
    /// Close a descriptor.
    Close = numbers::SYS_CLOSE,
}

impl SyscallKind {
    /// Number of argument words following the syscall number.
    pub const fn arity(self) -> usize {
        match self {
            Self::Halt => 0,
            Self::Exit
            | Self::Exec
            | Self::Wait
            | Self::Remove
            | Self::Open
            | Self::Filesize
            | Self::Tell
            | Self::Close => 1,
            Self::Create | Self::Seek => 2,
            Self::Read | Self::Write => 3,
        }
    }

    /// Value returned to the caller when the call fails recoverably.
    ///
    /// `None` for calls that return nothing.
    pub const fn failure_value(self) -> Option<i32> {
        match self {
            Self::Exec | Self::Wait | Self::Open | Self::Filesize | Self::Read | Self::Tell => {
                Some(-1)
            }
            Self::Create | Self::Remove | Self::Write => Some(0),
            Self::Halt | Self::Exit | Self::Seek | Self::Close => None,
        }
    }
}

impl TryFrom<u32> for SyscallKind {
    type Error = SyscallError;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        use numbers::*;
        match number {
            SYS_HALT => Ok(Self::Halt),
            SYS_EXIT => Ok(Self::Exit),
            SYS_EXEC => Ok(Self::Exec),
            SYS_WAIT => Ok(Self::Wait),
            SYS_CREATE => Ok(Self::Create),
            SYS_REMOVE => Ok(Self::Remove),
            SYS_OPEN => Ok(Self::Open),
            SYS_FILESIZE => Ok(Self::Filesize),
            SYS_READ => Ok(Self::Read),
            SYS_WRITE => Ok(Self::Write),
            SYS_SEEK => Ok(Self::Seek),
            SYS_TELL => Ok(Self::Tell),
            SYS_CLOSE => Ok(Self::Close),
            _ => Err(SyscallError::InvalidSyscallNumber),
        }
    }
}
