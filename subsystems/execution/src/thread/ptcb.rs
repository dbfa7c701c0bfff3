//! # Per-Thread Control Block
//!
//! Join/detach/exit bookkeeping for one thread. A PTCB is separate from the
//! execution unit running the thread so that it can outlive the unit while
//! joiners still need the exit value.

use crate::scheduler::UnitId;
use crate::sync::CondVar;
use crate::{ProcessId, ThreadId};

/// PTCB flags
pub mod flags {
    use bitflags::bitflags;

    bitflags! {
        /// PTCB state flags
        ///
        /// Both flags only ever go from clear to set.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct PtcbFlags: u32 {
            /// Thread has called exit; the exit value is valid
            const EXITED = 1 << 0;
            /// Thread can no longer be joined
            const DETACHED = 1 << 1;
        }
    }
}

pub use flags::PtcbFlags;

/// Per-thread control block
#[derive(Debug)]
pub struct Ptcb {
    /// Identity, also the thread handle
    id: ThreadId,
    /// Process holding this PTCB in its collection
    owner: ProcessId,
    /// Unit running the thread
    unit: UnitId,
    /// State flags
    flags: PtcbFlags,
    /// Exit value, meaningful once EXITED is set
    exitval: i32,
    /// Joiners currently interested in this PTCB
    refcount: usize,
    /// Broadcast on exit and on detach
    pub(crate) exit_cv: CondVar,
}

impl Ptcb {
    /// Create a joinable, running PTCB
    pub fn new(id: ThreadId, owner: ProcessId, unit: UnitId) -> Self {
        Self {
            id,
            owner,
            unit,
            flags: PtcbFlags::empty(),
            exitval: 0,
            refcount: 0,
            exit_cv: CondVar::new(),
        }
    }

    /// Get thread ID
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Get owning process
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    /// Get bound unit
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Get flags
    pub fn flags(&self) -> PtcbFlags {
        self.flags
    }

    /// Has the thread exited?
    pub fn is_exited(&self) -> bool {
        self.flags.contains(PtcbFlags::EXITED)
    }

    /// Has the thread been detached?
    pub fn is_detached(&self) -> bool {
        self.flags.contains(PtcbFlags::DETACHED)
    }

    /// Exit value, once the thread has exited
    pub fn exitval(&self) -> Option<i32> {
        self.is_exited().then_some(self.exitval)
    }

    /// Current joiner count
    pub fn refcount(&self) -> usize {
        self.refcount
    }

    /// Store the exit value and mark the thread exited
    pub fn mark_exited(&mut self, exitval: i32) {
        assert!(!self.is_exited(), "{} exited twice", self.id);
        self.exitval = exitval;
        self.flags.insert(PtcbFlags::EXITED);
    }

    /// Mark the thread detached
    pub fn mark_detached(&mut self) {
        self.flags.insert(PtcbFlags::DETACHED);
    }

    /// Register a joiner
    pub fn acquire(&mut self) {
        self.refcount += 1;
    }

    /// Unregister a joiner, returning how many remain
    pub fn release(&mut self) -> usize {
        assert!(self.refcount > 0, "{} refcount underflow", self.id);
        self.refcount -= 1;
        self.refcount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptcb() -> Ptcb {
        Ptcb::new(ThreadId::from_raw(1), ProcessId::INIT, UnitId::from_raw(9))
    }

    #[test]
    fn test_new_is_joinable() {
        let p = ptcb();
        assert!(!p.is_exited());
        assert!(!p.is_detached());
        assert_eq!(p.exitval(), None);
        assert_eq!(p.refcount(), 0);
        assert_eq!(p.unit(), UnitId::from_raw(9));
    }

    #[test]
    fn test_exit_publishes_value() {
        let mut p = ptcb();
        p.mark_exited(42);
        assert_eq!(p.exitval(), Some(42));
        assert_eq!(p.flags(), PtcbFlags::EXITED);
    }

    #[test]
    #[should_panic(expected = "exited twice")]
    fn test_double_exit_is_fatal() {
        let mut p = ptcb();
        p.mark_exited(1);
        p.mark_exited(2);
    }

    #[test]
    fn test_refcount() {
        let mut p = ptcb();
        p.acquire();
        p.acquire();
        assert_eq!(p.release(), 1);
        assert_eq!(p.release(), 0);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_refcount_underflow_is_fatal() {
        ptcb().release();
    }
}
