//! System Call Dispatcher
//!
//! Decodes the request block on the caller's stack, validates it word by
//! word, and routes it to its handler.
//!
//! # Security Considerations
//! - The request number is itself a user word and is probed like any other
//! - Arity is fixed per request; exactly the declared words are probed, in
//!   ascending order, before the handler is entered
//! - Unknown request numbers follow `KernelConfig::unknown_request`

use core::fmt;

use crate::config::UnknownRequest;
use crate::exception::TrapFrame;
use crate::kernel::{Kernel, Platform};
use crate::mm::UserAddr;
use crate::proc::{Scheduler, Tid};

use super::validate::Fault;

/// System call numbers, shared with the user-level library.
pub mod numbers {
    pub const SYS_HALT: usize = 0;
    pub const SYS_EXIT: usize = 1;
    pub const SYS_EXEC: usize = 2;
    pub const SYS_WAIT: usize = 3;
    pub const SYS_CREATE: usize = 4;
    pub const SYS_REMOVE: usize = 5;
    pub const SYS_OPEN: usize = 6;
    pub const SYS_FILESIZE: usize = 7;
    pub const SYS_READ: usize = 8;
    pub const SYS_WRITE: usize = 9;
    pub const SYS_SEEK: usize = 10;
    pub const SYS_TELL: usize = 11;
    pub const SYS_CLOSE: usize = 12;
    pub const SYS_PRACTICE: usize = 13;
}

/// Most argument words any request takes.
pub const MAX_ARGS: usize = 3;

/// A decoded request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Request {
    Halt = numbers::SYS_HALT,
    Exit = numbers::SYS_EXIT,
    Exec = numbers::SYS_EXEC,
    Wait = numbers::SYS_WAIT,
    Create = numbers::SYS_CREATE,
    Remove = numbers::SYS_REMOVE,
    Open = numbers::SYS_OPEN,
    Filesize = numbers::SYS_FILESIZE,
    Read = numbers::SYS_READ,
    Write = numbers::SYS_WRITE,
    Seek = numbers::SYS_SEEK,
    Tell = numbers::SYS_TELL,
    Close = numbers::SYS_CLOSE,
    Practice = numbers::SYS_PRACTICE,
}

impl Request {
    /// Number of argument words following the request number.
    pub const fn arity(self) -> usize {
        match self {
            Self::Halt => 0,
            Self::Exit
            | Self::Exec
            | Self::Wait
            | Self::Remove
            | Self::Open
            | Self::Filesize
            | Self::Tell
            | Self::Close
            | Self::Practice => 1,
            Self::Create | Self::Seek => 2,
            Self::Read | Self::Write => 3,
        }
    }
}

impl TryFrom<usize> for Request {
    type Error = usize;

    fn try_from(word: usize) -> Result<Self, Self::Error> {
        use numbers::*;
        Ok(match word {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit,
            SYS_EXEC => Self::Exec,
            SYS_WAIT => Self::Wait,
            SYS_CREATE => Self::Create,
            SYS_REMOVE => Self::Remove,
            SYS_OPEN => Self::Open,
            SYS_FILESIZE => Self::Filesize,
            SYS_READ => Self::Read,
            SYS_WRITE => Self::Write,
            SYS_SEEK => Self::Seek,
            SYS_TELL => Self::Tell,
            SYS_CLOSE => Self::Close,
            SYS_PRACTICE => Self::Practice,
            other => return Err(other),
        })
    }
}

/// A request that ends the caller instead of returning to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The caller asked to exit, or did something that forces exit.
    Exit(i32),
    /// A user address failed validation. Exits with -1.
    Fault(Fault),
    /// Power off.
    Halt,
}

impl From<Fault> for Stop {
    fn from(fault: Fault) -> Self {
        Stop::Fault(fault)
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(status) => write!(f, "exit({})", status),
            Self::Fault(fault) => write!(f, "fault: {}", fault),
            Self::Halt => write!(f, "halt"),
        }
    }
}

/// What the trap glue does once `dispatch` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to the caller.
    Resume,
    /// The caller has been torn down with this status.
    Exited(i32),
    /// The machine is shutting down.
    Halted,
}

/// Handler result: a value for the result slot, or a reason to stop.
pub(super) type Handled = Result<isize, Stop>;

impl<P: Platform> Kernel<P> {
    /// Dispatch one request from `tid`.
    ///
    /// # Returns
    /// How the trap should be left. On `Resume` the result slot of `frame`
    /// holds the handler's value, unless the request was ignored.
    pub fn dispatch(&self, tid: Tid, frame: &mut TrapFrame) -> Disposition {
        match self.route(tid, frame) {
            Ok(()) => Disposition::Resume,
            Err(Stop::Exit(status)) => {
                self.exit(tid, status);
                Disposition::Exited(status)
            }
            Err(Stop::Fault(fault)) => {
                log::warn!("[SYSCALL] {}: {}, terminating", tid, fault);
                self.exit(tid, -1);
                Disposition::Exited(-1)
            }
            Err(Stop::Halt) => {
                log::info!("[SYSCALL] {}: halt", tid);
                self.sched.shutdown();
                Disposition::Halted
            }
        }
    }

    fn route(&self, tid: Tid, frame: &mut TrapFrame) -> Result<(), Stop> {
        let guard = self.guard(tid);
        let block = UserAddr::new(frame.sp);

        let number = guard.validate_arg(block, 0)?;
        let request = match Request::try_from(number) {
            Ok(request) => request,
            Err(number) => {
                log::warn!("[SYSCALL] {}: unknown request {}", tid, number);
                return match self.config.unknown_request {
                    UnknownRequest::Ignore => Ok(()),
                    UnknownRequest::Terminate => Err(Stop::Exit(-1)),
                };
            }
        };

        let mut args = [0usize; MAX_ARGS];
        for (i, arg) in args.iter_mut().take(request.arity()).enumerate() {
            *arg = guard.validate_arg(block, i + 1)?;
        }
        log::debug!(
            "[SYSCALL] {}: {:?}{:x?}",
            tid,
            request,
            &args[..request.arity()]
        );

        let value = self.handle(tid, request, args)?;
        frame.result = value as usize;
        Ok(())
    }

    fn handle(&self, tid: Tid, request: Request, args: [usize; MAX_ARGS]) -> Handled {
        let [a0, a1, a2] = args;
        match request {
            Request::Halt => Err(Stop::Halt),
            Request::Exit => Err(Stop::Exit(a0 as i32)),
            Request::Exec => self.sys_exec(tid, a0),
            Request::Wait => self.sys_wait(tid, a0),
            Request::Practice => Ok(self.sys_practice(a0)),
            Request::Create => self.sys_create(tid, a0, a1),
            Request::Remove => self.sys_remove(tid, a0),
            Request::Open => self.sys_open(tid, a0),
            Request::Filesize => Ok(self.sys_filesize(tid, a0)),
            Request::Read => self.sys_read(tid, a0, a1, a2),
            Request::Write => self.sys_write(tid, a0, a1, a2),
            Request::Seek => Ok(self.sys_seek(tid, a0, a1)),
            Request::Tell => Ok(self.sys_tell(tid, a0)),
            Request::Close => Ok(self.sys_close(tid, a0)),
        }
    }
}
