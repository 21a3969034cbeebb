//! Trap-frame argument decoding
//!
//! The user stack at the trap holds the syscall number followed by the
//! kind's argument words:
//!
//! ```text
//! sp + 0 * WORD   syscall number
//! sp + 1 * WORD   argument 0
//! sp + 2 * WORD   argument 1
//! sp + 3 * WORD   argument 2
//! ```
//!
//! The number word is validated and read first. Once the kind is known,
//! the whole argument block for its arity is validated before any
//! argument word is read.

use crate::fs::Fd;
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::Pid;

use super::error::{SysResult, SyscallError};
use super::number::{SyscallKind, MAX_ARGS};
use super::validate::{read_user_word, validate_single, WORD_SIZE};

/// A decoded system call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRequest {
    /// Which call was requested.
    pub kind: SyscallKind,
    /// Its argument words.
    pub args: SyscallArgs,
}

impl SyscallRequest {
    /// Decode the request at user stack pointer `sp`.
    ///
    /// # Errors
    /// - `InvalidAddress` if the number word or any argument word of the
    ///   requested kind is not readable user memory
    /// - `InvalidSyscallNumber` if the number is not in the table
    pub fn decode<A: AddressSpace>(space: &A, sp: VirtAddr) -> SysResult<Self> {
        let number = read_user_word(space, sp)?;
        let kind = u32::try_from(number)
            .map_err(|_| SyscallError::InvalidSyscallNumber)
            .and_then(SyscallKind::try_from)?;

        let arity = kind.arity();
        let mut addrs = [VirtAddr::new(0); MAX_ARGS];
        for (i, addr) in addrs.iter_mut().take(arity).enumerate() {
            *addr = word_addr(sp, i + 1)?;
            validate_single(space, *addr)?;
        }

        let mut words = [0usize; MAX_ARGS];
        for (word, addr) in words.iter_mut().zip(addrs).take(arity) {
            *word = read_user_word(space, addr)?;
        }

        Ok(Self {
            kind,
            args: SyscallArgs { words, len: arity },
        })
    }
}

fn word_addr(sp: VirtAddr, index: usize) -> SysResult<VirtAddr> {
    index
        .checked_mul(WORD_SIZE)
        .and_then(|offset| sp.checked_add(offset))
        .ok_or(SyscallError::InvalidAddress)
}

/// The fixed-arity argument words of one request.
///
/// Accessors reinterpret a word as the type the handler expects. Asking
/// for an index past the kind's arity is a kernel bug, reported as
/// `InvalidAddress` so it still only costs the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallArgs {
    words: [usize; MAX_ARGS],
    len: usize,
}

impl SyscallArgs {
    /// Number of words.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw word `index`.
    pub fn word(&self, index: usize) -> SysResult<usize> {
        if index < self.len {
            Ok(self.words[index])
        } else {
            Err(SyscallError::InvalidAddress)
        }
    }

    /// Word `index` as a C `int` (low 32 bits).
    pub fn int(&self, index: usize) -> SysResult<i32> {
        self.word(index).map(|w| w as u32 as i32)
    }

    /// Word `index` as an unsigned 32-bit size or offset.
    pub fn uint(&self, index: usize) -> SysResult<u32> {
        self.word(index).map(|w| w as u32)
    }

    /// Word `index` as a user pointer.
    pub fn ptr(&self, index: usize) -> SysResult<VirtAddr> {
        self.word(index).map(VirtAddr::new)
    }

    /// Word `index` as a file descriptor.
    pub fn fd(&self, index: usize) -> SysResult<Fd> {
        self.int(index).map(Fd::new)
    }

    /// Word `index` as a process identifier.
    pub fn pid(&self, index: usize) -> SysResult<Pid> {
        self.int(index).map(Pid::new)
    }
}
