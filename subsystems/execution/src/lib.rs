//! # tinyk Execution Subsystem
//!
//! The execution subsystem manages:
//! - Thread creation, join, detach and exit
//! - Process creation, teardown and reaping
//! - Per-process file tables
//! - The scheduler interface the kernel runs on
//!
//! ## Key Principle
//!
//! All kernel state lives behind a single kernel lock. Threads coordinate
//! through condition variables that release that lock while the caller
//! sleeps. The scheduler itself is a collaborator behind the
//! [`scheduler::Scheduler`] trait.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod config;
pub mod files;
pub mod kernel;
pub mod process;
pub mod scheduler;
pub mod sync;
pub mod thread;

#[cfg(any(test, feature = "std"))]
pub mod host;


pub use config::KernelConfig;
pub use files::{Fid, FileControlBlock, StreamOps};
pub use kernel::{Kernel, Task};
pub use process::{ProcessInfo, ProcessState};
pub use scheduler::{Scheduler, UnitEntry, UnitId};
pub use thread::{PtcbFlags, ThreadInfo};

/// Thread identifier
///
/// The identity of a thread's PTCB. Identifiers are handed out in increasing
/// order and never reused by the same kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    /// Create from raw value
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

/// Unique identifier for processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// The root process, adopter of orphans
    pub const INIT: Self = Self(1);

    /// Create from raw value
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Get the kernel process ID (never allocated to a process)
    pub const fn kernel() -> Self {
        Self(0)
    }

    /// Is this the root process?
    pub fn is_init(self) -> bool {
        self == Self::INIT
    }

    /// Get the raw ID value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// Execution result type
pub type ExecResult<T> = Result<T, ExecError>;

/// Execution errors
///
/// None of these leave kernel state half-updated: every operation checks its
/// preconditions before touching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Thread is not registered in the caller's process
    UnknownThread,
    /// A thread tried to join itself
    SelfJoin,
    /// Thread is detached and cannot be joined (or detached again)
    AlreadyDetached,
    /// Thread has already exited and cannot be detached
    AlreadyExited,
    /// Thread was detached while the caller was waiting to join it
    DetachedWhileJoining,
    /// The scheduler could not provide an execution unit
    OutOfResources,
    /// No free process slot
    ProcessTableFull,
    /// Process is not a child of the caller
    NoSuchChild,
    /// Caller has no children to wait for
    NoChildren,
    /// The root process already exists
    AlreadyBooted,
    /// File id out of range or not open
    BadFileId,
    /// No free slot in the file table
    FileTableFull,
}

impl core::fmt::Display for ExecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ExecError::UnknownThread => "thread not found in calling process",
            ExecError::SelfJoin => "a thread cannot join itself",
            ExecError::AlreadyDetached => "thread is detached",
            ExecError::AlreadyExited => "thread has already exited",
            ExecError::DetachedWhileJoining => "thread was detached during join",
            ExecError::OutOfResources => "out of execution units",
            ExecError::ProcessTableFull => "process table full",
            ExecError::NoSuchChild => "no such child process",
            ExecError::NoChildren => "no child processes",
            ExecError::AlreadyBooted => "kernel already booted",
            ExecError::BadFileId => "bad file id",
            ExecError::FileTableFull => "file table full",
        };
        f.write_str(msg)
    }
}
