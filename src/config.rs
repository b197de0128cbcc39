//! Kernel boundary configuration
//!
//! Build-time defaults plus a small runtime override surface. The embedding
//! kernel constructs one `KernelConfig` at boot and hands it to [`Kernel::new`].
//!
//! [`Kernel::new`]: crate::Kernel::new

use log::LevelFilter;

/// Default kernel/user address split. Every user byte lives strictly below it.
pub const DEFAULT_USER_SPLIT: usize = 0xC000_0000;

/// What the dispatcher does with a request number it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownRequest {
    /// Leave the frame untouched and resume the caller.
    Ignore,
    /// Treat the request as a fault: exit the caller with status -1.
    Terminate,
}

/// How `read` validates its destination before any storage access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTarget {
    /// Every byte of `[buffer, buffer + size)` must be a mapped, writable user byte.
    Sized,
    /// The destination must hold a NUL-terminated string (legacy check).
    Terminated,
}

/// Runtime configuration for the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// First address that belongs to the kernel.
    pub user_split: usize,
    /// Policy for unrecognized request numbers.
    pub unknown_request: UnknownRequest,
    /// Destination check used by `read`.
    pub read_target: ReadTarget,
    /// Maximum level forwarded by the console logger.
    pub log_level: LevelFilter,
}

impl KernelConfig {
    /// Build-time defaults.
    pub const DEFAULT: Self = Self {
        user_split: DEFAULT_USER_SPLIT,
        unknown_request: if cfg!(feature = "strict-dispatch") {
            UnknownRequest::Terminate
        } else {
            UnknownRequest::Ignore
        },
        read_target: ReadTarget::Sized,
        log_level: LevelFilter::Info,
    };

    pub const fn with_user_split(mut self, split: usize) -> Self {
        self.user_split = split;
        self
    }

    pub const fn with_unknown_request(mut self, policy: UnknownRequest) -> Self {
        self.unknown_request = policy;
        self
    }

    pub const fn with_read_target(mut self, target: ReadTarget) -> Self {
        self.read_target = target;
        self
    }

    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
