//! Process control handlers: exec, wait, practice.
//!
//! halt and exit carry no handler body; the dispatcher turns them straight
//! into `Stop::Halt` and `Stop::Exit`.

use alloc::string::String;

use super::handler::Handled;
use crate::kernel::{Kernel, Platform};
use crate::mm::UserAddr;
use crate::proc::Tid;

impl<P: Platform> Kernel<P> {
    /// Validate a NUL-terminated user string and decode it.
    ///
    /// The outer `Result` is the fault path; `None` means the bytes were
    /// readable but not UTF-8.
    pub(super) fn user_str(&self, tid: Tid, addr: usize) -> Result<Option<String>, super::Fault> {
        let bytes = self.guard(tid).validate_cstring(UserAddr::new(addr))?;
        Ok(String::from_utf8(bytes).ok())
    }

    pub(super) fn sys_exec(&self, tid: Tid, cmdline: usize) -> Handled {
        let Some(cmdline) = self.user_str(tid, cmdline)? else {
            return Ok(-1);
        };
        match self.spawn(tid, &cmdline) {
            Ok(child) => Ok(child.raw() as isize),
            Err(err) => {
                log::debug!("[SYSCALL] {}: exec {:?}: {}", tid, cmdline, err);
                Ok(-1)
            }
        }
    }

    pub(super) fn sys_wait(&self, tid: Tid, pid: usize) -> Handled {
        let Some(child) = Tid::from_word(pid) else {
            log::debug!("[SYSCALL] {}: wait on pid word {:#x}", tid, pid);
            return Ok(-1);
        };
        match self.wait(tid, child) {
            Ok(status) => Ok(status as isize),
            Err(err) => {
                log::debug!("[SYSCALL] {}: wait: {}", tid, err);
                Ok(-1)
            }
        }
    }

    pub(super) fn sys_practice(&self, i: usize) -> isize {
        (i as i32).wrapping_add(1) as isize
    }
}
