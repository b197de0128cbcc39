//! Scrubbing Kernel Staging Buffers
//!
//! Bytes read from storage on behalf of one process pass through a kernel
//! buffer before they reach user memory. Once the buffer is freed the
//! allocator may hand it to anyone, so it is cleared first.
//!
//! # Design
//! - `Zeroize` for the byte containers the boundary layer stages data in
//! - `ZeroOnDrop<T>` clears its contents when it goes out of scope,
//!   including on an early return from a failed copy-out
//! - Volatile writes, so the clear survives dead-store elimination

use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

/// A byte container that can be overwritten with zeros.
pub trait Zeroize {
    fn zeroize(&mut self);
}

impl Zeroize for [u8] {
    fn zeroize(&mut self) {
        for byte in self.iter_mut() {
            // SAFETY: `byte` is a valid, aligned, exclusive reference.
            unsafe { ptr::write_volatile(byte, 0) };
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl<const N: usize> Zeroize for [u8; N] {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize();
    }
}

/// Clears the initialized length. Spare capacity was never written through
/// this vector.
impl Zeroize for Vec<u8> {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize();
    }
}

/// Owns a buffer and zeroes it on drop.
///
/// ```ignore
/// let mut staging = ZeroOnDrop::new(vec![0u8; 512]);
/// storage.read(&mut file, staging.inner_mut());
/// // cleared here, whichever way the scope is left
/// ```
#[derive(Debug)]
pub struct ZeroOnDrop<T: Zeroize> {
    inner: T,
}

impl<T: Zeroize> ZeroOnDrop<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    #[inline]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    #[inline]
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Zeroize> Drop for ZeroOnDrop<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
