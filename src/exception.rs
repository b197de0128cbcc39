//! Trap Entry
//!
//! The architecture stub saves the interrupted user state, builds a
//! `TrapFrame` and calls `handle_syscall` on the current execution context.
//!
//! # Security Considerations
//! - The stack pointer in the frame is a user value and is never trusted
//! - Nothing but the result slot of the frame is written back
//! - A request that ends the caller leaves the result slot untouched

use crate::kernel::{Kernel, Platform};
use crate::proc::Scheduler;
use crate::syscall::Disposition;

/// The part of the saved user state the boundary layer reads and writes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer: address of the request block.
    pub sp: usize,
    /// Result register restored to the user on return.
    pub result: usize,
}

impl TrapFrame {
    pub const fn new(sp: usize) -> Self {
        Self { sp, result: 0 }
    }
}

/// Handle a system call trap from the current context.
///
/// # Returns
/// `Resume` when the stub should restore the frame and return to user mode.
/// Otherwise the context is gone and the stub must not return to it.
pub fn handle_syscall<P: Platform>(kernel: &Kernel<P>, frame: &mut TrapFrame) -> Disposition {
    let tid = kernel.scheduler().current();
    kernel.dispatch(tid, frame)
}
