//! Descriptor Table
//!
//! Per-process mapping from small integers to open storage files.
//!
//! # Design
//! - Descriptors are handed out from a monotonic counter that starts above
//!   the two standard streams; a value is never reused while the process lives
//! - Entries are kept in a small vector and found by linear scan; processes
//!   hold tens of files at most
//! - Operations that reach the storage engine take `&mut S`, which callers
//!   can only obtain through the `FileSystem` lock

use alloc::vec::Vec;
use core::fmt;

use super::Storage;

/// A file descriptor as seen by user space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Standard input (not backed by the storage engine).
    pub const STDIN: Self = Self(0);

    /// Standard output (routed to the console).
    pub const STDOUT: Self = Self(1);

    /// First descriptor handed out for a storage file.
    pub const FIRST_FILE: Self = Self(2);

    /// Interpret a request word as a descriptor.
    ///
    /// Only the sign-extension of an `i32` names a descriptor. Any other
    /// word maps to -1, which is never handed out.
    #[inline]
    pub fn from_word(word: usize) -> Self {
        Self(i32::try_from(word as isize).unwrap_or(-1))
    }

    /// Get the raw descriptor value.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// No open file has this descriptor.
    BadDescriptor,
    /// The storage engine could not open the named file.
    NotFound,
    /// The descriptor counter is exhausted.
    Exhausted,
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDescriptor => write!(f, "bad file descriptor"),
            Self::NotFound => write!(f, "no such file"),
            Self::Exhausted => write!(f, "descriptor space exhausted"),
        }
    }
}

struct Entry<F> {
    fd: Fd,
    file: F,
}

/// Open files of one process.
pub struct DescriptorTable<F> {
    entries: Vec<Entry<F>>,
    next: i32,
}

impl<F> DescriptorTable<F> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: Fd::FIRST_FILE.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an already-open file under the next descriptor.
    pub fn insert(&mut self, file: F) -> Result<Fd, (F, FdError)> {
        let Some(after) = self.next.checked_add(1) else {
            return Err((file, FdError::Exhausted));
        };
        let fd = Fd(self.next);
        self.next = after;
        self.entries.push(Entry { fd, file });
        Ok(fd)
    }

    /// Look up the file behind `fd`.
    pub fn lookup(&self, fd: Fd) -> Result<&F, FdError> {
        self.entries
            .iter()
            .find(|e| e.fd == fd)
            .map(|e| &e.file)
            .ok_or(FdError::BadDescriptor)
    }

    /// Remove `fd` and hand back its file without closing it.
    pub fn remove(&mut self, fd: Fd) -> Result<F, FdError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.fd == fd)
            .ok_or(FdError::BadDescriptor)?;
        Ok(self.entries.swap_remove(index).file)
    }

    /// Put back a file taken out with `remove`, under the same descriptor.
    pub fn restore(&mut self, fd: Fd, file: F) {
        debug_assert!(self.lookup(fd).is_err());
        self.entries.push(Entry { fd, file });
    }

    /// Open `name` through the storage engine and install it.
    pub fn open<S>(&mut self, storage: &mut S, name: &str) -> Result<Fd, FdError>
    where
        S: Storage<File = F>,
    {
        let file = storage.open(name).ok_or(FdError::NotFound)?;
        self.insert(file).map_err(|(file, err)| {
            storage.close(file);
            err
        })
    }

    /// Close `fd` and release its storage handle.
    pub fn close<S>(&mut self, storage: &mut S, fd: Fd) -> Result<(), FdError>
    where
        S: Storage<File = F>,
    {
        let file = self.remove(fd)?;
        storage.close(file);
        Ok(())
    }

    /// Close every remaining entry. Used once, at process exit.
    pub fn close_all<S>(&mut self, storage: &mut S)
    where
        S: Storage<File = F>,
    {
        for entry in self.entries.drain(..) {
            storage.close(entry.file);
        }
    }
}

impl<F> Default for DescriptorTable<F> {
    fn default() -> Self {
        Self::new()
    }
}
