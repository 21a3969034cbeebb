//! System Call Handler
//!
//! Dispatches system calls and implements individual syscall handlers.
//!
//! # Security Considerations
//! - The number word and every argument word are validated before use
//! - Unknown syscall numbers terminate the caller before any handler runs
//! - Each handler validates the user memory its arguments point to
//! - Every filesystem call is made under the filesystem guard
//!
//! # Outcomes
//! A request ends in exactly one of: a value for the caller's result
//! register, a plain resume, termination of the caller, or power-off.

use alloc::vec;
use log::{debug, trace, warn};

use crate::drivers::{Console, Machine};
use crate::fs::{Fd, FileSystem, FsGuard};
use crate::mm::{AddressSpace, VirtAddr, PAGE_SIZE};
use crate::process::{Process, ProcessManager, KILLED};

use super::args::{SyscallArgs, SyscallRequest};
use super::error::{SysResult, SyscallError};
use super::number::SyscallKind;
use super::validate::{read_user_str, validate_range, validate_range_mut};

/// Largest piece of a `read` or `write` held in kernel memory at once.
pub const BOUNCE_SIZE: usize = PAGE_SIZE;

/// Largest transfer one `read` or `write` performs; its count must fit
/// the caller's `int` result.
pub const MAX_TRANSFER: usize = i32::MAX as usize;

fn transfer_size(requested: u32) -> usize {
    (requested as usize).min(MAX_TRANSFER)
}

/// A byte count or position as the caller's `int` result, saturating.
fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// What the dispatcher asks the trap path to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Write the value to the result register and resume.
    Return(i32),
    /// Resume without touching the result register.
    Resume,
    /// The process has terminated with this status.
    Terminated(i32),
    /// The machine was asked to power off.
    Halted,
}

/// What a handler completed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A value for the caller.
    Value(i32),
    /// Nothing to return.
    Done,
    /// The caller asked to exit with this status.
    Exit(i32),
    /// The caller asked to power off.
    Halt,
}

/// Handler result.
pub type SyscallResult = SysResult<Completion>;

/// The signature every handler shares.
pub type Handler<K, H, A> = fn(&K, &mut Process<H, A>, &SyscallArgs) -> SyscallResult;

/// Kernel services reachable from system calls.
///
/// Shared by all processes; each call borrows the caller's
/// [`Process`] explicitly.
#[derive(Debug)]
pub struct Kernel<F, P, C, M> {
    fs: FsGuard<F>,
    procs: P,
    console: C,
    machine: M,
}

impl<F, P, C, M> Kernel<F, P, C, M>
where
    F: FileSystem,
    P: ProcessManager,
    C: Console,
    M: Machine,
{
    /// Assemble the syscall layer over its collaborators.
    pub const fn new(fs: F, procs: P, console: C, machine: M) -> Self {
        Self {
            fs: FsGuard::new(fs),
            procs,
            console,
            machine,
        }
    }

    /// The filesystem guard.
    #[inline]
    pub fn fs(&self) -> &FsGuard<F> {
        &self.fs
    }

    /// The process manager.
    #[inline]
    pub fn procs(&self) -> &P {
        &self.procs
    }

    /// The console.
    #[inline]
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Machine power control.
    #[inline]
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Dispatch the system call trapped with user stack pointer `sp`.
    ///
    /// Fatal errors terminate `process` with status -1; recoverable ones
    /// become the kind's failure value.
    pub fn dispatch<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        sp: VirtAddr,
    ) -> SyscallOutcome {
        let request = match SyscallRequest::decode(process.space(), sp) {
            Ok(request) => request,
            Err(e) => return self.kill(process, None, e),
        };
        trace!("[SYSCALL] pid {}: {:?}", process.pid().as_i32(), request.kind);

        let handler = Self::handler::<A>(request.kind);
        match handler(self, process, &request.args) {
            Ok(Completion::Value(value)) => SyscallOutcome::Return(value),
            Ok(Completion::Done) => SyscallOutcome::Resume,
            Ok(Completion::Exit(status)) => SyscallOutcome::Terminated(process.terminate(status)),
            Ok(Completion::Halt) => SyscallOutcome::Halted,
            Err(e) if e.is_fatal() => self.kill(process, Some(request.kind), e),
            Err(e) => {
                debug!("[SYSCALL] {:?} failed: {}", request.kind, e);
                match request.kind.failure_value() {
                    Some(value) => SyscallOutcome::Return(value),
                    None => SyscallOutcome::Resume,
                }
            }
        }
    }

    fn kill<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        kind: Option<SyscallKind>,
        e: SyscallError,
    ) -> SyscallOutcome {
        warn!(
            "[SYSCALL] killing {} (pid {}) in {:?}: {}",
            process.name(),
            process.pid().as_i32(),
            kind,
            e
        );
        SyscallOutcome::Terminated(process.terminate(KILLED))
    }

    /// Handler for each syscall kind.
    pub fn handler<A: AddressSpace>(kind: SyscallKind) -> Handler<Self, F::File, A> {
        match kind {
            SyscallKind::Halt => Self::sys_halt,
            SyscallKind::Exit => Self::sys_exit,
            SyscallKind::Exec => Self::sys_exec,
            SyscallKind::Wait => Self::sys_wait,
            SyscallKind::Create => Self::sys_create,
            SyscallKind::Remove => Self::sys_remove,
            SyscallKind::Open => Self::sys_open,
            SyscallKind::Filesize => Self::sys_filesize,
            SyscallKind::Read => Self::sys_read,
            SyscallKind::Write => Self::sys_write,
            SyscallKind::Seek => Self::sys_seek,
            SyscallKind::Tell => Self::sys_tell,
            SyscallKind::Close => Self::sys_close,
        }
    }

    /// Tear down the syscall-side state of a terminated process.
    ///
    /// Prints the exit message, closes every descriptor still open and
    /// returns the status for the waiting parent. A process reaped
    /// without a recorded status is treated as killed.
    pub fn reap<A: AddressSpace>(&self, mut process: Process<F::File, A>) -> i32 {
        let status = process.terminate(KILLED);
        let message = alloc::format!("{}: exit({})\n", process.name(), status);
        self.console.putbuf(message.as_bytes());

        let closed = process.files().release_all(&self.fs);
        if closed > 0 {
            debug!("[PROCESS] {} closed {} leftover files", process.name(), closed);
        }
        status
    }

    fn sys_halt<A: AddressSpace>(
        &self,
        _process: &mut Process<F::File, A>,
        _args: &SyscallArgs,
    ) -> SyscallResult {
        self.machine.power_off();
        Ok(Completion::Halt)
    }

    fn sys_exit<A: AddressSpace>(
        &self,
        _process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        Ok(Completion::Exit(args.int(0)?))
    }

    fn sys_exec<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let cmd_line = read_user_str(process.space(), args.ptr(0)?)?;
        let pid = self
            .procs
            .execute(&cmd_line)
            .ok_or(SyscallError::OperationFailure)?;
        Ok(Completion::Value(pid.as_i32()))
    }

    fn sys_wait<A: AddressSpace>(
        &self,
        _process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let status = self
            .procs
            .wait(args.pid(0)?)
            .ok_or(SyscallError::ResourceNotFound)?;
        Ok(Completion::Value(status))
    }

    fn sys_create<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let name = read_user_str(process.space(), args.ptr(0)?)?;
        let size = args.uint(1)?;
        let created = self.fs.with(|fs| fs.create(&name, size));
        Ok(Completion::Value(created as i32))
    }

    fn sys_remove<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let name = read_user_str(process.space(), args.ptr(0)?)?;
        let removed = self.fs.with(|fs| fs.remove(&name));
        Ok(Completion::Value(removed as i32))
    }

    fn sys_open<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let name = read_user_str(process.space(), args.ptr(0)?)?;
        let file = self
            .fs
            .with(|fs| fs.open(&name))
            .ok_or(SyscallError::ResourceNotFound)?;
        let fd = process.files().allocate(file);
        Ok(Completion::Value(fd.as_i32()))
    }

    fn sys_filesize<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let file = process
            .files()
            .lookup(args.fd(0)?)
            .ok_or(SyscallError::ResourceNotFound)?;
        let length = self.fs.with(|fs| fs.length(file));
        Ok(Completion::Value(count(length as usize)))
    }

    fn sys_read<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let fd = args.fd(0)?;
        let size = transfer_size(args.uint(2)?);
        let buffer = validate_range_mut(process.space(), args.ptr(1)?, size)?;

        if fd == Fd::STDIN {
            for i in 0..size {
                buffer.write_byte(process.space_mut(), i, self.console.getc())?;
            }
            return Ok(Completion::Value(count(size)));
        }

        let (files, space) = process.files_and_space();
        let file = files.lookup(fd).ok_or(SyscallError::ResourceNotFound)?;
        let mut bounce = vec![0u8; size.min(BOUNCE_SIZE)];
        let mut total = 0;
        while total < size {
            let want = (size - total).min(BOUNCE_SIZE);
            let chunk = &mut bounce[..want];
            let got = self.fs.with(|fs| fs.read(&mut *file, chunk)).min(want);
            total += buffer.write_at(space, total, &bounce[..got])?;
            if got < want {
                break;
            }
        }
        Ok(Completion::Value(count(total)))
    }

    fn sys_write<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let fd = args.fd(0)?;
        let size = transfer_size(args.uint(2)?);
        let buffer = validate_range(process.space(), args.ptr(1)?, size)?;

        let (files, space) = process.files_and_space();
        let mut file = match fd {
            Fd::STDOUT => None,
            fd => Some(files.lookup(fd).ok_or(SyscallError::ResourceNotFound)?),
        };
        let mut bounce = vec![0u8; size.min(BOUNCE_SIZE)];
        let mut total = 0;
        while total < size {
            let want = (size - total).min(BOUNCE_SIZE);
            let chunk = &mut bounce[..want];
            buffer.read_at(&*space, total, chunk)?;
            let put = match file.as_mut() {
                Some(file) => self.fs.with(|fs| fs.write(&mut **file, chunk)).min(want),
                None => {
                    self.console.putbuf(chunk);
                    want
                }
            };
            total += put;
            if put < want {
                break;
            }
        }
        Ok(Completion::Value(count(total)))
    }

    fn sys_seek<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let pos = args.uint(1)?;
        let file = process
            .files()
            .lookup(args.fd(0)?)
            .ok_or(SyscallError::ResourceNotFound)?;
        self.fs.with(|fs| fs.seek(file, pos));
        Ok(Completion::Done)
    }

    fn sys_tell<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        let file = process
            .files()
            .lookup(args.fd(0)?)
            .ok_or(SyscallError::ResourceNotFound)?;
        let pos = self.fs.with(|fs| fs.tell(file));
        Ok(Completion::Value(count(pos as usize)))
    }

    fn sys_close<A: AddressSpace>(
        &self,
        process: &mut Process<F::File, A>,
        args: &SyscallArgs,
    ) -> SyscallResult {
        process.files().release(args.fd(0)?, &self.fs);
        Ok(Completion::Done)
    }
}
