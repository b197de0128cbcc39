//! System Call Input Validation
//!
//! The memory guard: the only code allowed to touch user memory.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: any fault is reported, never skipped
//! - Every byte is checked against the kernel/user split, then against the
//!   page's access bits, then probed with a fault-tolerant access
//! - Strings and buffers are copied into kernel memory as they are probed,
//!   so a user thread cannot change them between check and use

use alloc::vec::Vec;
use core::fmt;

use crate::mm::{PageAccess, UserAddr, UserMemory, WORD_SIZE};
use crate::proc::Tid;

/// Why a user address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The address is at or above the kernel/user split.
    KernelAddress,
    /// The page is not mapped with the required access, or the probe faulted.
    Unmapped,
    /// The range wraps around the top of the address space.
    Overflow,
}

/// A rejected user address. Always fatal to the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub addr: UserAddr,
    pub kind: FaultKind,
}

impl Fault {
    const fn new(addr: UserAddr, kind: FaultKind) -> Self {
        Self { addr, kind }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::KernelAddress => write!(f, "kernel address {}", self.addr),
            FaultKind::Unmapped => write!(f, "unmapped user address {}", self.addr),
            FaultKind::Overflow => write!(f, "user range wraps at {}", self.addr),
        }
    }
}

/// Memory guard bound to one process's address space.
pub struct Guard<'a, M: UserMemory> {
    memory: &'a M,
    space: Tid,
    split: usize,
}

impl<'a, M: UserMemory> Guard<'a, M> {
    pub fn new(memory: &'a M, space: Tid, split: usize) -> Self {
        Self {
            memory,
            space,
            split,
        }
    }

    /// Check one byte for `access` without reading it.
    fn check(&self, addr: UserAddr, access: PageAccess) -> Result<(), Fault> {
        if !addr.is_user(self.split) {
            return Err(Fault::new(addr, FaultKind::KernelAddress));
        }
        if !self.memory.access(self.space, addr).contains(access) {
            return Err(Fault::new(addr, FaultKind::Unmapped));
        }
        Ok(())
    }

    /// Check and read one byte.
    fn probe(&self, addr: UserAddr) -> Result<u8, Fault> {
        self.check(addr, PageAccess::READ)?;
        self.memory
            .read_byte(self.space, addr)
            .ok_or(Fault::new(addr, FaultKind::Unmapped))
    }

    fn offset(addr: UserAddr, i: usize) -> Result<UserAddr, Fault> {
        addr.checked_add(i)
            .ok_or(Fault::new(addr, FaultKind::Overflow))
    }

    /// Validate a native word at `addr` and return its value.
    ///
    /// Every one of its `WORD_SIZE` bytes is probed individually, so a word
    /// straddling the split or a page boundary is caught on the bad byte.
    pub fn validate_word(&self, addr: UserAddr) -> Result<usize, Fault> {
        let mut bytes = [0u8; WORD_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.probe(Self::offset(addr, i)?)?;
        }
        Ok(usize::from_ne_bytes(bytes))
    }

    /// Validate word `index` of the request block at `base`.
    pub fn validate_arg(&self, base: UserAddr, index: usize) -> Result<usize, Fault> {
        let offset = index
            .checked_mul(WORD_SIZE)
            .ok_or(Fault::new(base, FaultKind::Overflow))?;
        self.validate_word(Self::offset(base, offset)?)
    }

    /// Validate a NUL-terminated string at `addr` and copy it in.
    ///
    /// The returned bytes exclude the terminator. There is no length cap:
    /// a string that runs off the end of its mapping faults.
    pub fn validate_cstring(&self, addr: UserAddr) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::new();
        let mut i = 0;
        loop {
            let byte = self.probe(Self::offset(addr, i)?)?;
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte);
            i += 1;
        }
    }

    /// Validate `[addr, addr + len)` for `access` without touching it.
    pub fn validate_range(
        &self,
        addr: UserAddr,
        len: usize,
        access: PageAccess,
    ) -> Result<(), Fault> {
        for i in 0..len {
            self.check(Self::offset(addr, i)?, access)?;
        }
        Ok(())
    }

    /// Validate `[addr, addr + len)` for reading and copy it in.
    pub fn copy_in(&self, addr: UserAddr, len: usize) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::with_capacity(len.min(crate::mm::PAGE_SIZE));
        for i in 0..len {
            out.push(self.probe(Self::offset(addr, i)?)?);
        }
        Ok(out)
    }

    /// Write one byte into user memory.
    ///
    /// Unlike the validators this reports failure instead of faulting, so
    /// the caller can stop a copy-out part way.
    pub fn write_byte(&self, addr: UserAddr, byte: u8) -> bool {
        self.check(addr, PageAccess::WRITE).is_ok()
            && self.memory.write_byte(self.space, addr, byte)
    }
}
