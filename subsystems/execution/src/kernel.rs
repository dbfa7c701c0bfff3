//! # Kernel
//!
//! The kernel object: configuration, the scheduler it runs on, and all
//! process and thread state behind the single kernel lock.
//!
//! ## Waiting
//!
//! Every blocking operation follows the same monitor pattern: with the lock
//! held, enqueue the current unit on a [`crate::sync::CondVar`], then call
//! [`Kernel::kernel_wait`], which releases the lock, sleeps, and re-acquires
//! the lock before returning. Callers re-check their condition afterwards.

use crate::config::KernelConfig;
use crate::files::FileTable;
use crate::process::{Pcb, ProcessInfo, ProcessTable};
use crate::scheduler::{Scheduler, UnitId};
use crate::thread::{Ptcb, PtcbTable, ThreadInfo};
use crate::{ExecError, ExecResult, ProcessId, ThreadId};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// Code run by a thread
///
/// Receives the kernel and the argument bytes given at creation; its return
/// value becomes the thread's exit value (the process's, for a main thread).
pub type Task<S> = Box<dyn FnOnce(&Arc<Kernel<S>>, &[u8]) -> i32 + Send + 'static>;

/// What a unit spawned by the kernel is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnitBinding {
    /// Process the thread belongs to
    pub(crate) pid: ProcessId,
    /// The thread's PTCB
    pub(crate) tid: ThreadId,
}

/// Everything guarded by the kernel lock
#[derive(Debug)]
pub(crate) struct KernelState {
    /// All processes
    pub(crate) procs: ProcessTable,
    /// All PTCBs
    pub(crate) threads: PtcbTable,
    /// Units running a thread that has not exited
    pub(crate) units: BTreeMap<UnitId, UnitBinding>,
}

impl KernelState {
    fn new(config: &KernelConfig) -> Self {
        Self {
            procs: ProcessTable::new(config.max_processes),
            threads: PtcbTable::new(),
            units: BTreeMap::new(),
        }
    }

    /// Binding of a unit the kernel spawned
    pub(crate) fn binding(&self, unit: UnitId) -> UnitBinding {
        match self.units.get(&unit) {
            Some(binding) => *binding,
            None => panic!("unit {} is not running a kernel thread", unit.as_u64()),
        }
    }

    /// PCB of a process known to exist
    pub(crate) fn pcb(&self, pid: ProcessId) -> &Pcb {
        match self.procs.get(pid) {
            Some(pcb) => pcb,
            None => panic!("{} has no PCB", pid),
        }
    }

    /// Mutable PCB of a process known to exist
    pub(crate) fn pcb_mut(&mut self, pid: ProcessId) -> &mut Pcb {
        match self.procs.get_mut(pid) {
            Some(pcb) => pcb,
            None => panic!("{} has no PCB", pid),
        }
    }

    /// Mutable PTCB known to exist
    pub(crate) fn ptcb_mut(&mut self, tid: ThreadId) -> &mut Ptcb {
        match self.threads.get_mut(tid) {
            Some(ptcb) => ptcb,
            None => panic!("{} has no PTCB", tid),
        }
    }

    /// Release a PTCB if `pid` still holds it
    ///
    /// Removal from the process collection is the release gate: whoever
    /// removes it frees it, and nobody else can.
    pub(crate) fn release_ptcb(&mut self, pid: ProcessId, tid: ThreadId) -> bool {
        if !self.pcb_mut(pid).ptcbs.remove(&tid) {
            return false;
        }
        self.threads.remove(tid);
        log::trace!("released {}", tid);
        true
    }

    /// Held PTCBs of `pid` whose thread has not exited
    pub(crate) fn live_threads(&self, pid: ProcessId) -> usize {
        self.pcb(pid)
            .ptcbs
            .iter()
            .filter_map(|tid| self.threads.get(*tid))
            .filter(|ptcb| !ptcb.is_exited())
            .count()
    }

    /// Every non-exited PTCB is counted by its process, and nothing else is
    pub(crate) fn check_thread_accounting(&self, pid: ProcessId) {
        debug_assert_eq!(
            self.live_threads(pid),
            self.pcb(pid).thread_count,
            "thread accounting broken for {}",
            pid
        );
    }
}

/// A kernel instance
pub struct Kernel<S: Scheduler> {
    /// Configuration
    config: KernelConfig,
    /// Scheduler collaborator
    sched: S,
    /// The kernel lock
    state: Mutex<KernelState>,
}

impl<S: Scheduler> Kernel<S> {
    /// Create a kernel with no processes
    pub fn new(sched: S, config: KernelConfig) -> Arc<Self> {
        log::info!(
            "creating kernel on {} scheduler ({} process slots, {} file ids)",
            sched.name(),
            config.max_processes,
            config.max_fileid
        );
        Arc::new(Self {
            state: Mutex::new(KernelState::new(&config)),
            config,
            sched,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Get the scheduler
    pub fn scheduler(&self) -> &S {
        &self.sched
    }

    /// Create the init process and make its main thread runnable
    pub fn boot(self: &Arc<Self>, init: Task<S>, args: &[u8]) -> ExecResult<ProcessId> {
        let mut state = self.lock();
        if state.procs.contains(ProcessId::INIT) {
            return Err(ExecError::AlreadyBooted);
        }
        let pid = self.create_process(&mut state, None, init, args)?;
        debug_assert!(pid.is_init());
        log::info!("booted init as {}", pid);
        Ok(pid)
    }

    /// Take the kernel lock
    pub(crate) fn lock(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock()
    }

    /// Sleep with the kernel lock released
    ///
    /// The caller must have queued the current unit on a condition variable
    /// before calling this, or nothing will wake it.
    pub(crate) fn kernel_wait<'a>(
        &'a self,
        guard: MutexGuard<'a, KernelState>,
    ) -> MutexGuard<'a, KernelState> {
        drop(guard);
        self.sched.sleep();
        self.state.lock()
    }

    /// Create a process whose main thread runs `task`
    ///
    /// The child inherits `parent`'s open files. Nothing is left behind if
    /// the scheduler cannot spawn the main thread.
    pub(crate) fn create_process(
        self: &Arc<Self>,
        state: &mut KernelState,
        parent: Option<ProcessId>,
        task: Task<S>,
        args: &[u8],
    ) -> ExecResult<ProcessId> {
        let pid = state.procs.alloc_pid()?;

        let kernel = Arc::clone(self);
        let entry = Box::new(move || {
            kernel.run_main_thread(task);
        });
        let unit = match self.sched.spawn(entry) {
            Ok(unit) => unit,
            Err(err) => {
                state.procs.free_pid(pid);
                return Err(err);
            }
        };

        let files = match parent {
            Some(ppid) => FileTable::inherit(&state.pcb(ppid).files),
            None => FileTable::new(self.config.max_fileid),
        };
        let tid = state.threads.reserve();
        state.threads.insert(tid, pid, unit);

        let mut pcb = Pcb::new(pid, parent, files);
        pcb.args = (!args.is_empty()).then(|| args.to_vec());
        pcb.main_thread = Some(unit);
        pcb.ptcbs.insert(tid);
        pcb.thread_count = 1;
        state.procs.insert(pcb);

        if let Some(ppid) = parent {
            state.pcb_mut(ppid).children.insert(pid);
        }
        state.units.insert(unit, UnitBinding { pid, tid });
        state.check_thread_accounting(pid);

        log::debug!("created {} (main thread {}, parent {:?})", pid, tid, parent);
        self.sched.wakeup(unit);
        Ok(pid)
    }

    /// Main thread trampoline
    fn run_main_thread(self: Arc<Self>, task: Task<S>) -> ! {
        let args = {
            let state = self.lock();
            let binding = state.binding(self.sched.current());
            state.pcb(binding.pid).args.clone().unwrap_or_default()
        };
        let code = task(&self, &args);
        self.exit(code)
    }

    /// Thread trampoline
    pub(crate) fn run_thread(self: Arc<Self>, task: Task<S>, args: Vec<u8>) -> ! {
        let code = task(&self, &args);
        self.thread_exit(code)
    }

    /// Snapshot of a process
    pub fn process_info(&self, pid: ProcessId) -> Option<ProcessInfo> {
        let state = self.lock();
        let pcb = state.procs.get(pid)?;
        Some(ProcessInfo {
            pid,
            parent: pcb.parent,
            state: pcb.state,
            thread_count: pcb.thread_count,
            ptcbs: pcb.ptcbs.len(),
            live_threads: state.live_threads(pid),
            children: pcb.children.iter().copied().collect(),
            exited_children: pcb.exited_children.iter().copied().collect(),
            open_files: pcb.files.open_count(),
            has_main_thread: pcb.main_thread.is_some(),
            has_args: pcb.args.is_some(),
            exitval: pcb.exitval,
        })
    }

    /// Snapshot of a PTCB
    pub fn thread_info(&self, tid: ThreadId) -> Option<ThreadInfo> {
        self.lock().threads.get(tid).map(ThreadInfo::from)
    }

    /// Number of PTCBs not yet released
    pub fn ptcb_count(&self) -> usize {
        self.lock().threads.count()
    }

    /// Number of processes, zombies included
    pub fn process_count(&self) -> usize {
        self.lock().procs.count()
    }
}

impl<S: Scheduler> core::fmt::Debug for Kernel<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("scheduler", &self.sched.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
