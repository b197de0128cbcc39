//! usergate - the PantherOS user/kernel boundary
//!
//! Everything an unprivileged process hands the kernel passes through here:
//! the request number and argument words on its stack, the strings and
//! buffers those words point at, and the descriptors it names.
//!
//! # Layers
//! - `mm`: user address type and the memory guard (word, string and byte probes)
//! - `fs`: storage-engine seam, the serialization lock, per-process descriptor tables
//! - `proc`: process registry, child status records, spawn/wait/exit handshakes
//! - `syscall`: request table, dispatcher and handlers
//! - `exception`: the trap frame handed over by the low-level entry code
//!
//! # Security Model
//! - No user address is dereferenced before the guard has probed it
//! - A fault while validating terminates the caller with status -1; the
//!   request never reaches its handler
//! - Storage calls are serialized by one lock; the type system only hands out
//!   `&mut Storage` through that lock's guard
//!
//! The platform services this layer sits on (storage engine, scheduler,
//! address spaces, console) are traits bundled by [`Platform`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod exception;
pub mod fs;
pub mod kernel;
pub mod logger;
pub mod mm;
pub mod proc;
pub mod security;
pub mod syscall;

#[cfg(test)]
pub(crate) mod testing;

pub use config::KernelConfig;
pub use kernel::{Console, Kernel, Platform};
pub use proc::{Scheduler, Semaphore, Tid};
pub use syscall::{Disposition, Request};
