//! # PTCB Registry
//!
//! Arena owning every PTCB of a kernel. Processes refer to their PTCBs by
//! [`ThreadId`]; releasing a PTCB means removing it from here.

use super::Ptcb;
use crate::scheduler::UnitId;
use crate::{ProcessId, ThreadId};
use alloc::collections::BTreeMap;

/// PTCB arena
#[derive(Debug)]
pub struct PtcbTable {
    /// Next identity to hand out
    next_id: u64,
    /// Live PTCBs by ID
    ptcbs: BTreeMap<ThreadId, Ptcb>,
}

impl PtcbTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            next_id: 1,
            ptcbs: BTreeMap::new(),
        }
    }

    /// Reserve a fresh identity
    ///
    /// Identities are never reused, so a stale handle cannot name a newer
    /// thread.
    pub fn reserve(&mut self) -> ThreadId {
        let id = ThreadId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create the PTCB for a reserved identity
    pub fn insert(&mut self, id: ThreadId, owner: ProcessId, unit: UnitId) -> &mut Ptcb {
        debug_assert!(!self.ptcbs.contains_key(&id), "{} registered twice", id);
        self.ptcbs.entry(id).or_insert(Ptcb::new(id, owner, unit))
    }

    /// Get a PTCB
    pub fn get(&self, id: ThreadId) -> Option<&Ptcb> {
        self.ptcbs.get(&id)
    }

    /// Get a PTCB mutably
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Ptcb> {
        self.ptcbs.get_mut(&id)
    }

    /// Release a PTCB
    pub fn remove(&mut self, id: ThreadId) -> Option<Ptcb> {
        self.ptcbs.remove(&id)
    }

    /// Number of live PTCBs
    pub fn count(&self) -> usize {
        self.ptcbs.len()
    }
}

impl Default for PtcbTable {
    fn default() -> Self {
        Self::new()
    }
}
