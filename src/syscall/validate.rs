//! System Call Input Validation
//!
//! Decides, before anything is dereferenced, whether a user address is
//! safe to touch.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - No user address is ever turned into a kernel pointer: every byte
//!   is reached through a page-table translation of the caller's space
//! - Every page a buffer spans is checked, not just its two ends
//! - Data is copied between user and kernel memory (no TOCTOU on
//!   buffers the filesystem sees)
//!
//! A failure here is `SyscallError::InvalidAddress`, which the
//! dispatcher turns into termination of the calling process.

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::address::{pages_spanned, PAGE_SIZE};
use crate::mm::{AddressSpace, Mapping, PhysAddr, VirtAddr};

use super::error::{SysResult, SyscallError};

/// Size of one argument word on the user stack.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Longest string accepted from user space, NUL included.
pub const MAX_USER_STR: usize = PAGE_SIZE;

/// What the kernel is about to do with a user page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Translate `va` if it is a user address the caller may access.
fn user_mapping<A: AddressSpace>(space: &A, va: VirtAddr, access: Access) -> Option<Mapping> {
    if !va.is_user() {
        return None;
    }
    let mapping = space.translate(va)?;
    let allowed = match access {
        Access::Read => mapping.flags.is_user_accessible(),
        Access::Write => mapping.flags.is_user_writable(),
    };
    allowed.then_some(mapping)
}

/// Load one user byte without risking a fault.
///
/// Returns `None` for anything that is not a mapped, user-accessible
/// address. This is a page-table precheck rather than a trap-and-resume
/// fault: nothing is loaded unless the translation succeeded.
pub fn safe_byte_read<A: AddressSpace>(space: &A, va: VirtAddr) -> Option<u8> {
    user_mapping(space, va, Access::Read).map(|m| space.load(m.phys))
}

/// Validate the machine word at `va`.
///
/// Checks the user range, the mapping and a safe load of every byte of
/// the word, so a word straddling into an unmapped page is rejected.
pub fn validate_single<A: AddressSpace>(space: &A, va: VirtAddr) -> SysResult<()> {
    read_user_word(space, va).map(|_| ())
}

/// Read the machine word at `va` (native endian).
pub fn read_user_word<A: AddressSpace>(space: &A, va: VirtAddr) -> SysResult<usize> {
    let mut bytes = [0u8; WORD_SIZE];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let addr = va.checked_add(i).ok_or(SyscallError::InvalidAddress)?;
        *byte = safe_byte_read(space, addr).ok_or(SyscallError::InvalidAddress)?;
    }
    Ok(usize::from_ne_bytes(bytes))
}

fn check_pages<A: AddressSpace>(space: &A, base: VirtAddr, len: usize, access: Access) -> SysResult<()> {
    let pages = pages_spanned(base, len).ok_or(SyscallError::InvalidAddress)?;
    for page in pages {
        // The first page is checked at `base` itself, so a span starting
        // just below USER_START is caught even though its page base is 0.
        let at = if page < base { base } else { page };
        user_mapping(space, at, access).ok_or(SyscallError::InvalidAddress)?;
    }
    Ok(())
}

/// Validate a user buffer the kernel will read from.
///
/// A zero-length buffer still has to start on a mapped user page.
pub fn validate_range<A: AddressSpace>(space: &A, base: VirtAddr, len: usize) -> SysResult<UserSlice> {
    check_pages(space, base, len, Access::Read)?;
    Ok(UserSlice { base, len })
}

/// Validate a user buffer the kernel will write into.
///
/// Every page must be writable from user mode.
pub fn validate_range_mut<A: AddressSpace>(
    space: &A,
    base: VirtAddr,
    len: usize,
) -> SysResult<UserSliceMut> {
    check_pages(space, base, len, Access::Write)?;
    Ok(UserSliceMut { base, len })
}

/// Copy a NUL-terminated user string into the kernel.
///
/// Every byte up to and including the terminator is checked. An
/// unreadable byte is `InvalidAddress`; a string longer than
/// [`MAX_USER_STR`] or not valid UTF-8 is `OperationFailure`.
pub fn read_user_str<A: AddressSpace>(space: &A, va: VirtAddr) -> SysResult<String> {
    let mut bytes = Vec::new();
    for i in 0..MAX_USER_STR {
        let addr = va.checked_add(i).ok_or(SyscallError::InvalidAddress)?;
        match safe_byte_read(space, addr).ok_or(SyscallError::InvalidAddress)? {
            0 => return String::from_utf8(bytes).map_err(|_| SyscallError::OperationFailure),
            byte => bytes.push(byte),
        }
    }
    Err(SyscallError::OperationFailure)
}

/// Visit `[base, base + len)` one page-contiguous chunk at a time,
/// re-translating each page.
fn for_each_chunk<A, F>(space: &A, base: VirtAddr, len: usize, access: Access, mut visit: F) -> SysResult<()>
where
    A: AddressSpace,
    F: FnMut(PhysAddr, usize, usize),
{
    let mut va = base;
    let mut done = 0;
    while done < len {
        let chunk = (PAGE_SIZE - va.page_offset()).min(len - done);
        let mapping = user_mapping(space, va, access).ok_or(SyscallError::InvalidAddress)?;
        visit(mapping.phys, done, chunk);
        done += chunk;
        if done < len {
            va = va.checked_add(chunk).ok_or(SyscallError::InvalidAddress)?;
        }
    }
    Ok(())
}

/// A validated user-space buffer the kernel reads from.
///
/// Constructed only by [`validate_range`]. The pages are translated
/// again on every copy, so a mapping that disappeared in between is
/// reported, not dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSlice {
    base: VirtAddr,
    len: usize,
}

impl UserSlice {
    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy bytes starting `offset` bytes into the buffer into `out`.
    ///
    /// Copies at most `out.len()` bytes, never past the end of the
    /// buffer, and returns how many were copied.
    pub fn read_at<A: AddressSpace>(&self, space: &A, offset: usize, out: &mut [u8]) -> SysResult<usize> {
        let count = out.len().min(self.len.saturating_sub(offset));
        let start = self.base.checked_add(offset).ok_or(SyscallError::InvalidAddress)?;
        for_each_chunk(space, start, count, Access::Read, |phys, done, chunk| {
            for (i, byte) in out[done..done + chunk].iter_mut().enumerate() {
                *byte = space.load(PhysAddr::new(phys.as_usize() + i));
            }
        })?;
        Ok(count)
    }
}

/// A validated user-space buffer the kernel writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSliceMut {
    base: VirtAddr,
    len: usize,
}

impl UserSliceMut {
    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store one byte at `index`.
    pub fn write_byte<A: AddressSpace>(&self, space: &mut A, index: usize, byte: u8) -> SysResult<()> {
        if index >= self.len {
            return Err(SyscallError::InvalidAddress);
        }
        let va = self.base.checked_add(index).ok_or(SyscallError::InvalidAddress)?;
        let mapping = user_mapping(&*space, va, Access::Write).ok_or(SyscallError::InvalidAddress)?;
        space.store(mapping.phys, byte);
        Ok(())
    }

    /// Copy `data` into the buffer starting `offset` bytes in.
    ///
    /// Copies at most up to the end of the buffer and returns how many
    /// bytes were copied.
    pub fn write_at<A: AddressSpace>(&self, space: &mut A, offset: usize, data: &[u8]) -> SysResult<usize> {
        let count = data.len().min(self.len.saturating_sub(offset));
        let mut done = 0;
        while done < count {
            let va = offset
                .checked_add(done)
                .and_then(|at| self.base.checked_add(at))
                .ok_or(SyscallError::InvalidAddress)?;
            let chunk = (PAGE_SIZE - va.page_offset()).min(count - done);
            let mapping = user_mapping(&*space, va, Access::Write).ok_or(SyscallError::InvalidAddress)?;
            for (i, &byte) in data[done..done + chunk].iter().enumerate() {
                space.store(PhysAddr::new(mapping.phys.as_usize() + i), byte);
            }
            done += chunk;
        }
        Ok(count)
    }
}
