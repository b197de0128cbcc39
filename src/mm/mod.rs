//! Memory management module for the boundary layer
//!
//! Provides:
//! - The `UserAddr` type for addresses handed in by user processes
//! - The `UserMemory` seam onto per-process address spaces
//!
//! # Security Principles
//! - User addresses are plain numbers until the guard has probed them
//! - Page permissions are checked before every probe

pub mod address;
pub mod space;

pub use address::{UserAddr, PAGE_SIZE, WORD_SIZE};
pub use space::{PageAccess, UserMemory};
