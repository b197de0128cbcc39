//! System Call Interface
//!
//! Entry point for every request a user process makes.
//!
//! # Security Model
//! - The request number and each declared argument word are probed by the
//!   memory guard before the handler runs
//! - Pointer arguments are validated again, by shape, inside their handler
//! - A fault at any stage exits the caller with status -1
//!
//! # Current Syscalls
//! | nr | request  | args                 | result                     |
//! |----|----------|----------------------|----------------------------|
//! | 0  | halt     | -                    | does not return            |
//! | 1  | exit     | status               | does not return            |
//! | 2  | exec     | cmdline              | pid, or -1                 |
//! | 3  | wait     | pid                  | exit status, or -1         |
//! | 4  | create   | name, initial_size   | 1 on success, 0 otherwise  |
//! | 5  | remove   | name                 | 1 on success, 0 otherwise  |
//! | 6  | open     | name                 | fd >= 2, or -1             |
//! | 7  | filesize | fd                   | length, or -1              |
//! | 8  | read     | fd, buffer, size     | bytes read, or -1          |
//! | 9  | write    | fd, buffer, size     | bytes written, or -1       |
//! | 10 | seek     | fd, position         | 0, or -1                   |
//! | 11 | tell     | fd                   | position, or -1            |
//! | 12 | close    | fd                   | 0, or -1                   |
//! | 13 | practice | i                    | i + 1                      |

mod file;
mod handler;
mod process;
pub mod validate;

pub use handler::{numbers, Disposition, Request, Stop};
pub use validate::{Fault, FaultKind, Guard};
