//! User Page Mappings
//!
//! The view of a process's page tables that the syscall layer needs:
//! translate a user virtual address and move single bytes through the
//! translation. Building and walking the tables belongs to the VM
//! subsystem; this module only fixes the interface and the descriptor
//! bits it reports.
//!
//! # Security Properties
//! - Nothing here turns a user address into a kernel pointer
//! - Loads and stores only take a `PhysAddr` obtained from `translate`

use bitflags::bitflags;

use super::address::{PhysAddr, VirtAddr};

bitflags! {
    /// Page descriptor attributes for ARM64 stage-1 L3 entries.
    ///
    /// Only the bits the syscall layer inspects are named; the layout
    /// follows the ARMv8-A VMSA.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct PageFlags: u64 {
        /// Descriptor is valid.
        const VALID = 1 << 0;
        /// Page descriptor (L3) / table descriptor (L0-L2).
        const PAGE = 1 << 1;
        /// AP[1]: accessible from EL0.
        const AP_EL0 = 1 << 6;
        /// AP[2]: read-only at every level that can access it.
        const AP_RO = 1 << 7;
        /// Access flag.
        const AF = 1 << 10;
        /// Not global (ASID-tagged).
        const NG = 1 << 11;
        /// Privileged execute-never.
        const PXN = 1 << 53;
        /// User execute-never.
        const UXN = 1 << 54;

        /// User data: read/write from EL0, never executable.
        const USER_DATA = Self::VALID.bits() | Self::PAGE.bits() | Self::AP_EL0.bits()
            | Self::AF.bits() | Self::NG.bits() | Self::PXN.bits() | Self::UXN.bits();
        /// User code: read-only from EL0, executable at EL0 only.
        const USER_CODE = Self::VALID.bits() | Self::PAGE.bits() | Self::AP_EL0.bits()
            | Self::AP_RO.bits() | Self::AF.bits() | Self::NG.bits() | Self::PXN.bits();
        /// Kernel data: EL1 only.
        const KERNEL_DATA = Self::VALID.bits() | Self::PAGE.bits() | Self::AF.bits()
            | Self::PXN.bits() | Self::UXN.bits();
    }
}

impl PageFlags {
    /// Check if the entry is valid (present).
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.contains(Self::VALID)
    }

    /// Check if EL0 may read through this entry.
    #[inline]
    pub const fn is_user_accessible(self) -> bool {
        self.is_valid() && self.contains(Self::AP_EL0)
    }

    /// Check if EL0 may write through this entry.
    #[inline]
    pub const fn is_user_writable(self) -> bool {
        self.is_user_accessible() && !self.contains(Self::AP_RO)
    }
}

/// Result of translating one user virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Physical address of the byte (frame base plus page offset).
    pub phys: PhysAddr,
    /// Attributes of the page holding it.
    pub flags: PageFlags,
}

/// A process's user address space, as seen from the kernel.
///
/// Implemented by the VM subsystem over the live page tables. The
/// syscall layer never dereferences a user address directly; every
/// access goes through [`AddressSpace::translate`] first.
pub trait AddressSpace {
    /// Walk the page tables for `va`.
    ///
    /// Returns `None` when no valid page maps `va`.
    fn translate(&self, va: VirtAddr) -> Option<Mapping>;

    /// Load one byte from a physical address returned by `translate`.
    fn load(&self, pa: PhysAddr) -> u8;

    /// Store one byte to a physical address returned by `translate`.
    fn store(&mut self, pa: PhysAddr, byte: u8);
}
