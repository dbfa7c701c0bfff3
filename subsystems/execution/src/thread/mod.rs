//! # Thread Management
//!
//! Thread creation, join, detach and exit.

pub mod ptcb;
pub mod registry;
pub mod syscalls;

pub use ptcb::*;
pub use registry::*;

use crate::{ProcessId, ThreadId};

/// Snapshot of a PTCB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    /// Thread ID
    pub id: ThreadId,
    /// Owning process
    pub owner: ProcessId,
    /// Has the thread exited?
    pub exited: bool,
    /// Has the thread been detached?
    pub detached: bool,
    /// Joiners currently registered
    pub refcount: usize,
    /// Exit value, if exited
    pub exitval: Option<i32>,
}

impl From<&Ptcb> for ThreadInfo {
    fn from(ptcb: &Ptcb) -> Self {
        Self {
            id: ptcb.id(),
            owner: ptcb.owner(),
            exited: ptcb.is_exited(),
            detached: ptcb.is_detached(),
            refcount: ptcb.refcount(),
            exitval: ptcb.exitval(),
        }
    }
}
