//! Machine power control
//!
//! The `halt` system call powers the machine off. On QEMU virt this is
//! a PSCI `SYSTEM_OFF` call through the hypervisor conduit.

/// Power control for the whole machine.
pub trait Machine {
    /// Power the machine off. On real hardware this does not return.
    fn power_off(&self);
}

/// PSCI function ID for SYSTEM_OFF.
const PSCI_SYSTEM_OFF: u64 = 0x8400_0008;

/// PSCI firmware interface (HVC conduit).
#[derive(Debug, Default, Clone, Copy)]
pub struct Psci;

impl Machine for Psci {
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    fn power_off(&self) {
        crate::kprintln!("[POWER] PSCI SYSTEM_OFF");
        // SAFETY: SYSTEM_OFF takes no arguments and never returns on a
        // PSCI-compliant platform. QEMU virt provides PSCI over HVC.
        unsafe {
            core::arch::asm!(
                "mov x0, {fn_id}",
                "hvc #0",
                fn_id = in(reg) PSCI_SYSTEM_OFF,
                options(nostack, noreturn),
            );
        }
    }

    #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
    fn power_off(&self) {
        log::warn!("PSCI SYSTEM_OFF ({:#x}) unavailable on this target", PSCI_SYSTEM_OFF);
    }
}
