//! ARM64 Exception Handling
//!
//! Entry from user mode into the system-call layer.
//!
//! # Exception Levels
//! - EL0: User applications
//! - EL1: Kernel (where we run)
//!
//! # System Call ABI
//! User code traps with `svc #0x30`. The saved `SP_EL0` points at the
//! syscall number, followed by the argument words; the result is
//! returned in `x0`.
//!
//! # Security Considerations
//! - Anything user mode can cause here ends the offending process, never
//!   the kernel
//! - Register state is preserved and restored by the vector stubs

use crate::drivers::{Console, Machine};
use crate::fs::FileSystem;
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::{Process, ProcessManager, KILLED};
use crate::syscall::{Kernel, SyscallOutcome};

/// A trap vector: the SVC immediate user code uses, the lowest
/// privilege allowed to raise it, and whether it runs with IRQs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapVector {
    /// SVC immediate.
    pub number: u16,
    /// Lowest privilege that may raise it (3 = user).
    pub privilege: u8,
    /// Handler runs with interrupts enabled.
    pub interrupts_enabled: bool,
}

/// The system call vector.
pub const SYSCALL_VECTOR: TrapVector = TrapVector {
    number: 0x30,
    privilege: 3,
    interrupts_enabled: true,
};

/// Exception context saved on the stack
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionContext {
    /// General purpose registers x0-x30
    pub gpr: [u64; 31],
    /// Exception Link Register (return address)
    pub elr: u64,
    /// Saved Program Status Register
    pub spsr: u64,
    /// Exception Syndrome Register
    pub esr: u64,
    /// Fault Address Register
    pub far: u64,
    /// User stack pointer (SP_EL0)
    pub sp_el0: u64,
}

impl ExceptionContext {
    /// The ISS field of ESR_EL1; for an SVC, its immediate.
    #[inline]
    pub const fn iss(&self) -> u32 {
        (self.esr & 0x01FF_FFFF) as u32
    }

    /// Store a syscall result in x0, sign-extended.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.gpr[0] = value as i64 as u64;
    }
}

/// Exception class extracted from ESR_EL1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionClass {
    Unknown = 0x00,
    SvcAarch64 = 0x15,
    InstructionAbortLowerEl = 0x20,
    InstructionAbortSameEl = 0x21,
    DataAbortLowerEl = 0x24,
    DataAbortSameEl = 0x25,
    Other = 0xFF,
}

impl From<u64> for ExceptionClass {
    fn from(esr: u64) -> Self {
        let ec = ((esr >> 26) & 0x3F) as u8;
        match ec {
            0x00 => ExceptionClass::Unknown,
            0x15 => ExceptionClass::SvcAarch64,
            0x20 => ExceptionClass::InstructionAbortLowerEl,
            0x21 => ExceptionClass::InstructionAbortSameEl,
            0x24 => ExceptionClass::DataAbortLowerEl,
            0x25 => ExceptionClass::DataAbortSameEl,
            _ => ExceptionClass::Other,
        }
    }
}

/// What the scheduler glue does after a trap from EL0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Return to the interrupted process.
    Resume,
    /// The process terminated; reap it and schedule another.
    Exit(i32),
    /// The machine is powering off.
    PowerOff,
}

/// Handle a synchronous exception from EL0.
///
/// System calls go to the dispatcher. User-mode aborts and SVCs with a
/// foreign immediate terminate the process with status -1.
pub fn handle_sync_lower_el<F, P, C, M, A>(
    kernel: &Kernel<F, P, C, M>,
    process: &mut Process<F::File, A>,
    ctx: &mut ExceptionContext,
) -> TrapOutcome
where
    F: FileSystem,
    P: ProcessManager,
    C: Console,
    M: Machine,
    A: AddressSpace,
{
    let ec = ExceptionClass::from(ctx.esr);

    match ec {
        ExceptionClass::SvcAarch64 if ctx.iss() == SYSCALL_VECTOR.number as u32 => {
            let sp = VirtAddr::new(ctx.sp_el0 as usize);
            match kernel.dispatch(process, sp) {
                SyscallOutcome::Return(value) => {
                    ctx.set_return(value);
                    TrapOutcome::Resume
                }
                SyscallOutcome::Resume => TrapOutcome::Resume,
                SyscallOutcome::Terminated(status) => TrapOutcome::Exit(status),
                SyscallOutcome::Halted => TrapOutcome::PowerOff,
            }
        }
        ExceptionClass::DataAbortLowerEl | ExceptionClass::InstructionAbortLowerEl => {
            log::warn!(
                "[EXCEPTION] {} abort at {:#018x} (ESR {:#018x})",
                process.name(),
                ctx.far,
                ctx.esr
            );
            TrapOutcome::Exit(process.terminate(KILLED))
        }
        _ => {
            log::warn!(
                "[EXCEPTION] {} unhandled {:?}, ESR {:#018x}",
                process.name(),
                ec,
                ctx.esr
            );
            TrapOutcome::Exit(process.terminate(KILLED))
        }
    }
}

/// Initialize exception handling
///
/// Installs the vector table (VBAR_EL1). The table itself, with 2 KiB
/// alignment and the register save/restore stubs, is provided by the
/// boot assembly.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub fn init() {
    extern "C" {
        static __exception_vectors: u8;
    }

    // SAFETY:
    // - __exception_vectors is defined in boot assembly with 2KB alignment
    // - Writing to VBAR_EL1 is valid at EL1
    unsafe {
        let vector_addr = &raw const __exception_vectors as u64;
        core::arch::asm!(
            "msr vbar_el1, {v}",
            "isb",
            v = in(reg) vector_addr,
            options(nostack, preserves_flags)
        );
    }

    log::info!("[BOOT] Exception vectors installed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::number::numbers;
    use crate::testing::{Harness, DATA};

    fn svc(imm: u32, sp: usize) -> ExceptionContext {
        ExceptionContext {
            esr: (0x15u64 << 26) | imm as u64,
            sp_el0: sp as u64,
            ..Default::default()
        }
    }

    #[test]
    fn test_syscall_result_in_x0() {
        let mut h = Harness::new();
        h.fs(|fs| fs.create("f", 0));
        let name = h.put_str(DATA, "f");
        let sp = h.push_request(numbers::SYS_OPEN, &[name]);

        let mut ctx = svc(0x30, sp);
        let outcome = handle_sync_lower_el(&h.kernel, &mut h.process, &mut ctx);
        assert_eq!(outcome, TrapOutcome::Resume);
        assert_eq!(ctx.gpr[0], 2);
    }

    #[test]
    fn test_negative_result_sign_extended() {
        let mut h = Harness::new();
        let sp = h.push_request(numbers::SYS_FILESIZE, &[9]);
        let mut ctx = svc(0x30, sp);
        let outcome = handle_sync_lower_el(&h.kernel, &mut h.process, &mut ctx);
        assert_eq!(outcome, TrapOutcome::Resume);
        assert_eq!(ctx.gpr[0], u64::MAX);
    }

    #[test]
    fn test_foreign_svc_immediate_kills() {
        let mut h = Harness::new();
        let sp = h.push_request(numbers::SYS_HALT, &[]);
        let mut ctx = svc(0x80, sp);
        let outcome = handle_sync_lower_el(&h.kernel, &mut h.process, &mut ctx);
        assert_eq!(outcome, TrapOutcome::Exit(-1));
        assert!(!h.kernel.machine().is_off());
    }

    #[test]
    fn test_user_data_abort_kills_process_only() {
        let mut h = Harness::new();
        let mut ctx = ExceptionContext {
            esr: 0x24 << 26,
            far: 0xdead_0000,
            ..Default::default()
        };
        let outcome = handle_sync_lower_el(&h.kernel, &mut h.process, &mut ctx);
        assert_eq!(outcome, TrapOutcome::Exit(-1));
        assert_eq!(h.process.exit_status(), Some(-1));
    }

    #[test]
    fn test_halt_powers_off() {
        let mut h = Harness::new();
        let sp = h.push_request(numbers::SYS_HALT, &[]);
        let mut ctx = svc(0x30, sp);
        let outcome = handle_sync_lower_el(&h.kernel, &mut h.process, &mut ctx);
        assert_eq!(outcome, TrapOutcome::PowerOff);
        assert!(h.kernel.machine().is_off());
    }
}
