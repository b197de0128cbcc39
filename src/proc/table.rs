//! Process Registry
//!
//! Arena of live execution contexts keyed by `Tid`. Parent and child links
//! are identifiers into this table, so a link to a context that has gone
//! away simply fails to resolve.
//!
//! The table sits behind the kernel's registry lock. Lock order is registry
//! first, then the storage lock; never the reverse.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::lifecycle::{ChildState, ChildStatus, Settled};
use super::Tid;
use crate::fs::{DescriptorTable, Storage};

/// Per-process resources.
pub struct Process<F> {
    name: String,
    /// Kept open while the process runs so the image cannot be rewritten.
    executable: Option<F>,
    files: DescriptorTable<F>,
}

impl<F> Process<F> {
    pub fn new(name: &str, executable: Option<F>) -> Self {
        Self {
            name: String::from(name),
            executable,
            files: DescriptorTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files_mut(&mut self) -> &mut DescriptorTable<F> {
        &mut self.files
    }

    /// Close the executable and every open descriptor.
    pub fn release<S>(&mut self, storage: &mut S)
    where
        S: Storage<File = F>,
    {
        if let Some(executable) = self.executable.take() {
            storage.close(executable);
        }
        self.files.close_all(storage);
    }
}

/// One live execution context.
pub struct Context<F, S> {
    parent: Option<Tid>,
    children: Vec<ChildStatus<S>>,
    /// Signaled by a child once its startup has settled.
    handshake: Arc<S>,
    process: Process<F>,
}

impl<F, S> Context<F, S> {
    pub fn new(parent: Option<Tid>, handshake: Arc<S>, process: Process<F>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            handshake,
            process,
        }
    }

    pub fn parent(&self) -> Option<Tid> {
        self.parent
    }

    pub fn children(&self) -> &[ChildStatus<S>] {
        &self.children
    }

    pub fn handshake(&self) -> &Arc<S> {
        &self.handshake
    }

    pub fn process(&self) -> &Process<F> {
        &self.process
    }

    pub fn process_mut(&mut self) -> &mut Process<F> {
        &mut self.process
    }
}

/// All live contexts.
pub struct ProcessTable<F, S> {
    contexts: BTreeMap<Tid, Context<F, S>>,
}

impl<F, S> ProcessTable<F, S> {
    pub const fn new() -> Self {
        Self {
            contexts: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.contexts.contains_key(&tid)
    }

    /// Register a context. Hands it back if `tid` is already live.
    pub fn insert(&mut self, tid: Tid, context: Context<F, S>) -> Result<(), Context<F, S>> {
        if self.contexts.contains_key(&tid) {
            return Err(context);
        }
        self.contexts.insert(tid, context);
        Ok(())
    }

    pub fn get(&self, tid: Tid) -> Option<&Context<F, S>> {
        self.contexts.get(&tid)
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Context<F, S>> {
        self.contexts.get_mut(&tid)
    }

    pub fn remove(&mut self, tid: Tid) -> Option<Context<F, S>> {
        self.contexts.remove(&tid)
    }

    /// Parent's record for `child`, if it still tracks one.
    pub fn child(&self, parent: Tid, child: Tid) -> Option<&ChildStatus<S>> {
        self.get(parent)?.children.iter().find(|c| c.child() == child)
    }

    fn child_mut(&mut self, parent: Tid, child: Tid) -> Option<&mut ChildStatus<S>> {
        self.get_mut(parent)?
            .children
            .iter_mut()
            .find(|c| c.child() == child)
    }

    /// Make sure `parent` tracks `child`, creating a Pending record if not.
    ///
    /// Both sides of a spawn call this: whichever runs first creates the
    /// record. `false` if `parent` is not live.
    pub fn track_child(&mut self, parent: Tid, child: Tid, done: impl FnOnce() -> S) -> bool {
        let Some(context) = self.get_mut(parent) else {
            return false;
        };
        if !context.children.iter().any(|c| c.child() == child) {
            context.children.push(ChildStatus::new(child, Arc::new(done())));
        }
        true
    }

    /// Move `parent`'s record for `child` from Pending to Active.
    pub fn confirm_child(&mut self, parent: Tid, child: Tid) -> bool {
        self.child_mut(parent, child)
            .map(ChildStatus::confirm)
            .unwrap_or(false)
    }

    /// Current state of `parent`'s record for `child`.
    pub fn child_state(&self, parent: Tid, child: Tid) -> Option<ChildState> {
        self.child(parent, child).map(ChildStatus::state)
    }

    /// Remove and return `parent`'s record for `child`.
    pub fn take_child(&mut self, parent: Tid, child: Tid) -> Option<ChildStatus<S>> {
        let children = &mut self.get_mut(parent)?.children;
        let index = children.iter().position(|c| c.child() == child)?;
        Some(children.remove(index))
    }

    /// Drop the records of an exiting parent and cut each live child loose.
    pub fn orphan(&mut self, context: &mut Context<F, S>) {
        for record in context.children.drain(..) {
            if let Some(child) = self.contexts.get_mut(&record.child()) {
                child.parent = None;
            }
        }
    }

    /// Record the exit of `child` in its parent's record.
    ///
    /// Returns the semaphore the caller must signal once the registry lock
    /// is released: the parent's handshake if the child never finished
    /// starting, the record's completion semaphore otherwise.
    pub fn settle_parent(&mut self, parent: Option<Tid>, child: Tid, status: i32) -> Option<Arc<S>> {
        let parent = parent?;
        let context = self.contexts.get_mut(&parent)?;
        let record = context.children.iter_mut().find(|c| c.child() == child)?;
        match record.settle(status) {
            Settled::StartupFailed => Some(context.handshake.clone()),
            Settled::Exited => Some(record.done().clone()),
            Settled::Already => None,
        }
    }
}

impl<F, S> Default for ProcessTable<F, S> {
    fn default() -> Self {
        Self::new()
    }
}
