//! # Process Table
//!
//! PID allocation and PCB storage.

use super::Pcb;
use crate::{ExecError, ExecResult, ProcessId};
use alloc::collections::{BTreeMap, BTreeSet};

/// Process table
#[derive(Debug)]
pub struct ProcessTable {
    /// All processes, alive or zombie
    processes: BTreeMap<ProcessId, Pcb>,
    /// Released pids, reused lowest first
    free: BTreeSet<u32>,
    /// Lowest pid never handed out
    next: u32,
    /// One past the highest usable pid
    limit: u32,
}

impl ProcessTable {
    /// Create a table with `max_processes` slots
    ///
    /// Slot 0 is the kernel's and is never handed out.
    pub fn new(max_processes: usize) -> Self {
        Self {
            processes: BTreeMap::new(),
            free: BTreeSet::new(),
            next: 1,
            limit: u32::try_from(max_processes).unwrap_or(u32::MAX),
        }
    }

    /// Allocate a pid
    pub fn alloc_pid(&mut self) -> ExecResult<ProcessId> {
        if let Some(raw) = self.free.pop_first() {
            return Ok(ProcessId::from_raw(raw));
        }
        if self.next >= self.limit {
            return Err(ExecError::ProcessTableFull);
        }
        let pid = ProcessId::from_raw(self.next);
        self.next += 1;
        Ok(pid)
    }

    /// Return a pid that was allocated but never used
    pub fn free_pid(&mut self, pid: ProcessId) {
        debug_assert!(!self.processes.contains_key(&pid), "{} still in use", pid);
        self.free.insert(pid.as_u32());
    }

    /// Store a PCB under its pid
    pub fn insert(&mut self, pcb: Pcb) {
        let pid = pcb.pid();
        let previous = self.processes.insert(pid, pcb);
        debug_assert!(previous.is_none(), "{} registered twice", pid);
    }

    /// Remove a PCB and free its pid
    pub fn remove(&mut self, pid: ProcessId) -> Option<Pcb> {
        let pcb = self.processes.remove(&pid)?;
        self.free.insert(pid.as_u32());
        Some(pcb)
    }

    /// Get a process
    pub fn get(&self, pid: ProcessId) -> Option<&Pcb> {
        self.processes.get(&pid)
    }

    /// Get a process mutably
    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Pcb> {
        self.processes.get_mut(&pid)
    }

    /// Is `pid` in use?
    pub fn contains(&self, pid: ProcessId) -> bool {
        self.processes.contains_key(&pid)
    }

    /// Get process count
    pub fn count(&self) -> usize {
        self.processes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileTable;

    fn pcb(pid: ProcessId) -> Pcb {
        Pcb::new(pid, None, FileTable::new(1))
    }

    #[test]
    fn test_first_pid_is_init() {
        let mut table = ProcessTable::new(4);
        assert_eq!(table.alloc_pid(), Ok(ProcessId::INIT));
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let mut table = ProcessTable::new(3);
        let a = table.alloc_pid().unwrap();
        let b = table.alloc_pid().unwrap();
        assert_eq!(table.alloc_pid(), Err(ExecError::ProcessTableFull));

        table.insert(pcb(a));
        table.insert(pcb(b));
        assert_eq!(table.count(), 2);

        assert!(table.remove(a).is_some());
        assert!(!table.contains(a));
        assert_eq!(table.alloc_pid(), Ok(a));
    }

    #[test]
    fn test_free_unused_pid() {
        let mut table = ProcessTable::new(2);
        let pid = table.alloc_pid().unwrap();
        table.free_pid(pid);
        assert_eq!(table.alloc_pid(), Ok(pid));
        assert!(table.remove(ProcessId::from_raw(5)).is_none());
    }
}
