//! User Address Spaces
//!
//! The seam between the memory guard and whatever owns the page tables.
//! The guard first asks which accesses a page permits, then performs a
//! fault-tolerant probe of the byte itself. Platforms that can introspect
//! their page tables answer `access` exactly; platforms that cannot may
//! report `PageAccess::all()` and rely on the probe alone.

use bitflags::bitflags;

use super::address::UserAddr;
use crate::proc::Tid;

bitflags! {
    /// Accesses a user page permits from the kernel side.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageAccess: u8 {
        /// The page is mapped and readable.
        const READ = 1 << 0;
        /// The page is mapped and writable.
        const WRITE = 1 << 1;
    }
}

/// Per-process user memory as seen by the kernel.
///
/// `space` names the process whose address space is meant; on a single-CPU
/// kernel it is always the caller that trapped in.
pub trait UserMemory {
    /// Accesses permitted on the page holding `addr`. Empty if unmapped.
    fn access(&self, space: Tid, addr: UserAddr) -> PageAccess;

    /// Fault-tolerant single-byte read. `None` if the read faulted.
    fn read_byte(&self, space: Tid, addr: UserAddr) -> Option<u8>;

    /// Fault-tolerant single-byte write. `false` if the write faulted.
    fn write_byte(&self, space: Tid, addr: UserAddr, byte: u8) -> bool;
}
