//! # Process Management
//!
//! Process control blocks and the process table. A process owns the PTCBs
//! of its threads, its children and its file table; it becomes a zombie when
//! its last thread exits and stays one until its parent reaps it.

pub mod syscalls;
pub mod table;
pub mod teardown;

pub use table::ProcessTable;

use crate::files::FileTable;
use crate::scheduler::UnitId;
use crate::sync::CondVar;
use crate::{ProcessId, ThreadId};
use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Process has live threads
    Alive,
    /// Every thread has exited; waiting to be reaped
    Zombie,
}

/// Process control block
#[derive(Debug)]
pub struct Pcb {
    /// Process ID
    pid: ProcessId,
    /// Parent process, `None` only for init
    pub(crate) parent: Option<ProcessId>,
    /// Current state
    pub(crate) state: ProcessState,
    /// PTCBs this process is responsible for releasing
    pub(crate) ptcbs: BTreeSet<ThreadId>,
    /// Threads that have not passed the exit barrier
    pub(crate) thread_count: usize,
    /// Child processes, alive or zombie
    pub(crate) children: BTreeSet<ProcessId>,
    /// Zombie children, oldest first
    pub(crate) exited_children: VecDeque<ProcessId>,
    /// Broadcast when a child is added to `exited_children`
    pub(crate) child_exit: CondVar,
    /// Unit of the main thread
    pub(crate) main_thread: Option<UnitId>,
    /// Argument buffer handed to the main thread
    pub(crate) args: Option<Vec<u8>>,
    /// Exit status reported to the parent
    pub(crate) exitval: i32,
    /// Open files
    pub(crate) files: FileTable,
}

impl Pcb {
    /// Create a live process with no threads yet
    pub fn new(pid: ProcessId, parent: Option<ProcessId>, files: FileTable) -> Self {
        Self {
            pid,
            parent,
            state: ProcessState::Alive,
            ptcbs: BTreeSet::new(),
            thread_count: 0,
            children: BTreeSet::new(),
            exited_children: VecDeque::new(),
            child_exit: CondVar::new(),
            main_thread: None,
            args: None,
            exitval: 0,
            files,
        }
    }

    /// Get process ID
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Get parent process
    pub fn parent(&self) -> Option<ProcessId> {
        self.parent
    }

    /// Get state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Is this process a zombie?
    pub fn is_zombie(&self) -> bool {
        self.state == ProcessState::Zombie
    }

    /// Get thread count
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Does this process hold `tid` in its collection?
    pub fn owns_thread(&self, tid: ThreadId) -> bool {
        self.ptcbs.contains(&tid)
    }

    /// Get the file table
    pub fn files(&self) -> &FileTable {
        &self.files
    }
}

/// Snapshot of a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: ProcessId,
    /// Parent process
    pub parent: Option<ProcessId>,
    /// Current state
    pub state: ProcessState,
    /// Threads not yet exited, as counted by the process
    pub thread_count: usize,
    /// PTCBs still held by the process
    pub ptcbs: usize,
    /// Held PTCBs whose thread has not exited
    pub live_threads: usize,
    /// Child processes
    pub children: Vec<ProcessId>,
    /// Zombie children, oldest first
    pub exited_children: Vec<ProcessId>,
    /// Open file ids
    pub open_files: usize,
    /// Main thread still attached
    pub has_main_thread: bool,
    /// Argument buffer still held
    pub has_args: bool,
    /// Exit status
    pub exitval: i32,
}
