//! Start-up errors.
//!
//! Once tasks are running there is nothing to report: processor faults are
//! terminal and handled in the arch layer.

use core::fmt;

/// Misuse of the kernel set-up API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KernelError {
    /// `init` was called a second time; the task set is fixed once built.
    AlreadyInitialized,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => f.write_str("task table already initialized"),
        }
    }
}
