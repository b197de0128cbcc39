//! Lifecycle Coordinator
//!
//! Spawn, wait and exit, and the child status record that links them.
//!
//! # Record States
//! ```text
//!   Pending ──confirm──▶ Active ──child exits──▶ Exited(status)
//!      │
//!      └──child exits before confirm──▶ Failed
//! ```
//! A record leaves its parent's list when the parent consumes it (`wait`,
//! or `spawn` on a failed start) or when the parent exits. Terminal states
//! never change.
//!
//! # Signals
//! - The parent's handshake semaphore is signaled once per spawn, by the
//!   child, when its startup has either succeeded or failed
//! - A record's completion semaphore is signaled once, by the child, at exit
//!
//! Both are signaled after the registry lock is released.

use alloc::format;
use alloc::sync::Arc;
use core::fmt;

use super::table::{Context, Process};
use super::{Scheduler, Semaphore, Tid};
use crate::kernel::{Console, FileOf, Kernel, Platform};

/// Where a child stands, from its parent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    /// Spawn requested; the child has not finished starting.
    Pending,
    /// The child is running user code.
    Active,
    /// The child exited before finishing its startup.
    Failed,
    /// The child exited with this status.
    Exited(i32),
}

/// What a child's exit did to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    StartupFailed,
    Exited,
    Already,
}

/// One child as tracked by its parent.
pub struct ChildStatus<S> {
    child: Tid,
    state: ChildState,
    done: Arc<S>,
}

impl<S> ChildStatus<S> {
    pub fn new(child: Tid, done: Arc<S>) -> Self {
        Self {
            child,
            state: ChildState::Pending,
            done,
        }
    }

    pub fn child(&self) -> Tid {
        self.child
    }

    pub fn state(&self) -> ChildState {
        self.state
    }

    /// Completion semaphore, signaled when the child exits.
    pub fn done(&self) -> &Arc<S> {
        &self.done
    }

    /// Pending -> Active.
    pub fn confirm(&mut self) -> bool {
        if self.state != ChildState::Pending {
            return false;
        }
        self.state = ChildState::Active;
        true
    }

    pub(crate) fn settle(&mut self, status: i32) -> Settled {
        match self.state {
            ChildState::Pending => {
                self.state = ChildState::Failed;
                Settled::StartupFailed
            }
            ChildState::Active => {
                self.state = ChildState::Exited(status);
                Settled::Exited
            }
            ChildState::Failed | ChildState::Exited(_) => Settled::Already,
        }
    }
}

/// Why `spawn` produced no child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// The scheduler could not create a context.
    NoContext,
    /// The child was created but failed to start.
    StartupFailed,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContext => write!(f, "no execution context"),
            Self::StartupFailed => write!(f, "child failed to start"),
        }
    }
}

/// `wait` on something that is not a tracked child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAChild(pub Tid);

impl fmt::Display for NotAChild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a waitable child", self.0)
    }
}

impl<P: Platform> Kernel<P> {
    /// Register a new context once its loader has finished.
    ///
    /// Called on the new context before it first enters user mode.
    /// `executable` is the opened image, or `None` if loading failed; in that
    /// case the context is torn down with status -1 and `false` is returned.
    pub fn start_process(
        &self,
        tid: Tid,
        parent: Option<Tid>,
        name: &str,
        executable: Option<FileOf<P>>,
    ) -> bool {
        let loaded = executable.is_some();
        let handshake = Arc::new(self.sched.semaphore());
        let wake = {
            let mut procs = self.procs.lock();
            let parent = parent.filter(|&p| procs.contains(p));
            let context = Context::new(parent, handshake, Process::new(name, executable));
            if let Err(mut context) = procs.insert(tid, context) {
                // A parent still waiting in spawn must not stay blocked.
                let waiting = parent.and_then(|p| match procs.child_state(p, tid) {
                    None | Some(ChildState::Pending) => {
                        procs.take_child(p, tid);
                        procs.get(p).map(|c| c.handshake().clone())
                    }
                    Some(_) => None,
                });
                drop(procs);
                log::error!("[PROCESS] {} started twice", tid);
                context.process_mut().release(&mut *self.fs.lock());
                if let Some(handshake) = waiting {
                    handshake.up();
                }
                return false;
            }
            if let Some(p) = parent {
                procs.track_child(p, tid, || self.sched.semaphore());
            }
            match parent {
                Some(p) if loaded && procs.confirm_child(p, tid) => {
                    procs.get(p).map(|c| c.handshake().clone())
                }
                _ => None,
            }
        };

        if !loaded {
            log::info!("[PROCESS] {} ({}) failed to load", name, tid);
            self.exit(tid, -1);
            return false;
        }
        log::info!("[PROCESS] {} ({}) started", name, tid);
        if let Some(handshake) = wake {
            handshake.up();
        }
        true
    }

    /// Start `cmdline` as a child of `parent` and wait for its startup.
    pub fn spawn(&self, parent: Tid, cmdline: &str) -> Result<Tid, SpawnError> {
        let child = self
            .sched
            .spawn_process(parent, cmdline)
            .ok_or(SpawnError::NoContext)?;

        let handshake = {
            let mut procs = self.procs.lock();
            if !procs.track_child(parent, child, || self.sched.semaphore()) {
                return Err(SpawnError::NoContext);
            }
            procs.get(parent).map(|c| c.handshake().clone())
        }
        .ok_or(SpawnError::NoContext)?;

        handshake.down();

        let mut procs = self.procs.lock();
        match procs.child_state(parent, child) {
            Some(ChildState::Active) | Some(ChildState::Exited(_)) => Ok(child),
            _ => {
                procs.take_child(parent, child);
                Err(SpawnError::StartupFailed)
            }
        }
    }

    /// Block until `child` exits and consume its status.
    pub fn wait(&self, parent: Tid, child: Tid) -> Result<i32, NotAChild> {
        let done = self
            .procs
            .lock()
            .child(parent, child)
            .map(|c| c.done().clone())
            .ok_or(NotAChild(child))?;

        done.down();

        let record = self
            .procs
            .lock()
            .take_child(parent, child)
            .ok_or(NotAChild(child))?;
        match record.state() {
            ChildState::Exited(status) => Ok(status),
            _ => Err(NotAChild(child)),
        }
    }

    /// Terminate `tid` with `status`.
    ///
    /// Reports the exit on the console, orphans the children, hands the
    /// status to the parent, then closes the executable and every descriptor
    /// under the storage lock. The parent is signaled before any storage
    /// handle is closed.
    pub fn exit(&self, tid: Tid, status: i32) {
        let Some(mut context) = self.procs.lock().remove(tid) else {
            log::warn!("[PROCESS] exit from unregistered context {}", tid);
            self.sched.terminate(tid);
            return;
        };

        self.report_exit(context.process().name(), status);

        let wake = {
            let mut procs = self.procs.lock();
            procs.orphan(&mut context);
            procs.settle_parent(context.parent(), tid, status)
        };
        if let Some(sem) = wake {
            sem.up();
        }

        context.process_mut().release(&mut *self.fs.lock());
        log::info!("[PROCESS] {} ({}) exited with status {}", context.process().name(), tid, status);
        self.sched.terminate(tid);
    }

    fn report_exit(&self, name: &str, status: i32) {
        let line = format!("{}: exit({})\n", name, status);
        self.console.write_bytes(line.as_bytes());
    }
}
