//! Process Lifecycle
//!
//! Tracks which processes are alive, who spawned whom, and the one channel
//! through which a child's exit status reaches its parent.
//!
//! # Design
//! - Processes refer to each other by `Tid` through one registry, never by
//!   reference; clearing a back-link means rewriting an identifier
//! - A parent owns one `ChildStatus` record per tracked child; the record's
//!   state only moves forward (see `ChildState`)
//! - The only blocking points are the spawn handshake and `wait`, both on
//!   platform semaphores, and neither is entered with a lock held

pub mod lifecycle;
pub mod table;

use core::fmt;

pub use lifecycle::{ChildState, ChildStatus, SpawnError};
pub use table::{Context, Process, ProcessTable};

/// Identity of an execution context. Doubles as the process id: there is
/// exactly one context per process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Tid(u32);

impl Tid {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Interpret a request word as a process id. `None` if the word does
    /// not fit a `u32`.
    #[inline]
    pub fn from_word(word: usize) -> Option<Self> {
        u32::try_from(word).ok().map(Self)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A blocking semaphore provided by the scheduler. Created at zero.
pub trait Semaphore: Send + Sync {
    /// Block until the count is positive, then decrement it.
    fn down(&self);
    /// Increment the count, waking one waiter.
    fn up(&self);
}

/// Contract of the external scheduler and process-creation service.
pub trait Scheduler {
    type Semaphore: Semaphore;

    /// Identity of the context that trapped in.
    fn current(&self) -> Tid;

    /// Create a context for `cmdline` as a child of `parent` and start
    /// loading its executable. `None` if no context could be created.
    ///
    /// The new context reports back through `Kernel::start_process`.
    fn spawn_process(&self, parent: Tid, cmdline: &str) -> Option<Tid>;

    /// A fresh semaphore with count zero.
    fn semaphore(&self) -> Self::Semaphore;

    /// Retire `tid` after its exit teardown. On hardware this does not
    /// return when `tid` is the running context.
    fn terminate(&self, tid: Tid);

    /// Power the machine off. On hardware this does not return.
    fn shutdown(&self);
}
