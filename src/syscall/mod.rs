//! System Call Interface
//!
//! The secure entry point for user-mode applications.
//!
//! # Security Model
//! - Whitelist approach: only the thirteen calls below are served
//! - The number word and all argument words are validated before use
//! - Invalid addresses and numbers terminate the caller (status -1)
//! - Missing files and refused operations return a failure value
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmd_line) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(name, initial_size) -> bool
//! - 5: remove(name) -> bool
//! - 6: open(name) -> fd
//! - 7: filesize(fd) -> length
//! - 8: read(fd, buf, len) -> count
//! - 9: write(fd, buf, len) -> count
//! - 10: seek(fd, pos)
//! - 11: tell(fd) -> pos
//! - 12: close(fd)

pub mod args;
pub mod error;
mod handler;
pub mod number;
pub mod validate;

pub use args::{SyscallArgs, SyscallRequest};
pub use error::SyscallError;
pub use handler::{Completion, Handler, Kernel, SyscallOutcome, SyscallResult};
pub use number::SyscallKind;
pub use validate::{UserSlice, UserSliceMut};
