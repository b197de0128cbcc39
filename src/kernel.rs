//! The Kernel Aggregate
//!
//! `Kernel` owns every piece of boundary state: the storage engine behind
//! its serialization lock, the process registry behind its own lock, and the
//! platform services it calls out to.
//!
//! # Locks
//! - `procs` (registry) is always taken before `fs` (storage), never after
//! - Neither lock is held across a semaphore `down`

use spin::Mutex;

use crate::config::KernelConfig;
use crate::fs::{FileSystem, Storage};
use crate::mm::UserMemory;
use crate::proc::{ProcessTable, Scheduler, Tid};
use crate::syscall::validate::Guard;

/// Output sink for user-visible text: fd 1 writes and exit reports.
pub trait Console: Send + Sync {
    fn write_bytes(&self, bytes: &[u8]);
}

/// The services a concrete machine provides.
pub trait Platform: Sized + 'static {
    type Storage: Storage + Send;
    type Memory: UserMemory + Send + Sync;
    type Scheduler: Scheduler + Send + Sync;
    type Console: Console;
}

/// Open-file handle type of a platform.
pub type FileOf<P> = <<P as Platform>::Storage as Storage>::File;

/// Semaphore type of a platform.
pub type SemaphoreOf<P> = <<P as Platform>::Scheduler as Scheduler>::Semaphore;

/// The boundary layer.
pub struct Kernel<P: Platform> {
    pub(crate) config: KernelConfig,
    pub(crate) fs: FileSystem<P::Storage>,
    pub(crate) memory: P::Memory,
    pub(crate) sched: P::Scheduler,
    pub(crate) console: P::Console,
    pub(crate) procs: Mutex<ProcessTable<FileOf<P>, SemaphoreOf<P>>>,
}

impl<P: Platform> Kernel<P> {
    pub fn new(
        config: KernelConfig,
        storage: P::Storage,
        memory: P::Memory,
        sched: P::Scheduler,
        console: P::Console,
    ) -> Self {
        Self {
            config,
            fs: FileSystem::new(storage),
            memory,
            sched,
            console,
            procs: Mutex::new(ProcessTable::new()),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The storage engine behind its serialization lock. Loaders use this
    /// to open an executable before calling `start_process`.
    pub fn filesystem(&self) -> &FileSystem<P::Storage> {
        &self.fs
    }

    pub fn memory(&self) -> &P::Memory {
        &self.memory
    }

    pub fn scheduler(&self) -> &P::Scheduler {
        &self.sched
    }

    pub fn console(&self) -> &P::Console {
        &self.console
    }

    /// Number of live execution contexts.
    pub fn live_processes(&self) -> usize {
        self.procs.lock().len()
    }

    /// Memory guard over `tid`'s address space.
    pub(crate) fn guard(&self, tid: Tid) -> Guard<'_, P::Memory> {
        Guard::new(&self.memory, tid, self.config.user_split)
    }
}
