//! Security Primitives Module
//!
//! Confidentiality helpers for data the kernel moves between processes and
//! storage.
//!
//! # Security Properties
//! - Staging buffers are zeroed when no longer needed
//! - Zeroing uses volatile writes

pub mod zeroize;

pub use zeroize::{ZeroOnDrop, Zeroize};
