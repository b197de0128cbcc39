//! User Address Type
//!
//! A type-safe wrapper for addresses that came from user space. A `UserAddr`
//! is only a number: it carries no proof that anything lives there, and it
//! cannot be turned into a pointer. The memory guard is the only code that
//! reads or writes through one.
//!
//! # Security Properties
//! - User addresses cannot be dereferenced directly
//! - Offsetting never wraps; overflow is reported as `None`
//! - The kernel/user split is checked explicitly, never assumed

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Width of one request word in bytes (the native machine word).
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// An address supplied by a user process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(usize);

impl UserAddr {
    /// Wrap a raw user-supplied value.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if this address lies strictly below the kernel/user split.
    #[inline]
    pub const fn is_user(self, split: usize) -> bool {
        self.0 < split
    }

    /// Add an offset, or `None` if the result would wrap the address space.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
