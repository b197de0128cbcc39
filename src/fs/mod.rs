//! File system access for the boundary layer
//!
//! The storage engine itself is external and not reentrant. This module
//! owns the single lock that serializes every call into it, and the
//! per-process descriptor tables that name its open files.
//!
//! # Security Properties
//! - `&mut Storage` is only reachable through a `FileSystem` guard, so no
//!   handler can call the engine without holding the lock
//! - The guard releases on every exit path, early returns included

pub mod fd;

use spin::{Mutex, MutexGuard};

pub use fd::{DescriptorTable, Fd, FdError};

/// Contract of the external storage engine.
///
/// Handles are owned values: the engine gives one out on `open` and takes
/// it back on `close`. Offsets and sizes are in bytes.
pub trait Storage {
    /// An open file.
    type File: Send;

    fn create(&mut self, name: &str, initial_size: u32) -> bool;
    fn remove(&mut self, name: &str) -> bool;
    fn open(&mut self, name: &str) -> Option<Self::File>;
    fn close(&mut self, file: Self::File);
    fn read(&mut self, file: &mut Self::File, dst: &mut [u8]) -> usize;
    fn write(&mut self, file: &mut Self::File, src: &[u8]) -> usize;
    fn seek(&mut self, file: &mut Self::File, pos: u32);
    fn tell(&mut self, file: &Self::File) -> u32;
    fn length(&mut self, file: &Self::File) -> u32;
}

/// The storage engine behind its serialization lock.
pub struct FileSystem<S: Storage> {
    engine: Mutex<S>,
}

impl<S: Storage> FileSystem<S> {
    pub const fn new(engine: S) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    /// Acquire the serialization lock.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.engine.lock()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.engine.is_locked()
    }
}
