//! # Process System Calls

use crate::kernel::{Kernel, Task};
use crate::scheduler::Scheduler;
use crate::{ExecError, ExecResult, ProcessId};
use alloc::sync::Arc;

impl<S: Scheduler> Kernel<S> {
    /// Start a child process running `task`
    ///
    /// The child gets a copy of `args` and shares the caller's open files.
    pub fn exec(self: &Arc<Self>, task: Task<S>, args: &[u8]) -> ExecResult<ProcessId> {
        let mut state = self.lock();
        let caller = state.binding(self.scheduler().current());
        self.create_process(&mut state, Some(caller.pid), task, args)
    }

    /// The caller's process ID
    pub fn get_pid(&self) -> ProcessId {
        let unit = self.scheduler().current();
        self.lock().binding(unit).pid
    }

    /// The caller's parent process ID
    ///
    /// Init reports the kernel pid.
    pub fn get_ppid(&self) -> ProcessId {
        let unit = self.scheduler().current();
        let state = self.lock();
        let pid = state.binding(unit).pid;
        state.pcb(pid).parent().unwrap_or(ProcessId::kernel())
    }

    /// Set the process exit status and end the calling thread
    ///
    /// Init reaps all of its children first, so that it never becomes a
    /// zombie with children attached.
    pub fn exit(&self, code: i32) -> ! {
        let pid = self.get_pid();
        if pid.is_init() {
            while let Ok((child, status)) = self.wait_child(None) {
                log::debug!("init reaped {} (status {})", child, status);
            }
        }
        self.lock().pcb_mut(pid).exitval = code;
        self.thread_exit(code)
    }

    /// Wait for a child to become a zombie and reap it
    ///
    /// With `Some(pid)`, waits for that child; with `None`, for whichever
    /// child exits first. Returns the child's pid and exit status.
    pub fn wait_child(&self, child: Option<ProcessId>) -> ExecResult<(ProcessId, i32)> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let caller = state.binding(unit).pid;

        let zombie = loop {
            let pcb = state.pcb(caller);
            let ready = match child {
                Some(cpid) => {
                    if !pcb.children.contains(&cpid) {
                        return Err(ExecError::NoSuchChild);
                    }
                    state.pcb(cpid).is_zombie().then_some(cpid)
                }
                None => {
                    if pcb.children.is_empty() {
                        return Err(ExecError::NoChildren);
                    }
                    pcb.exited_children.front().copied()
                }
            };
            if let Some(zombie) = ready {
                break zombie;
            }
            state.pcb_mut(caller).child_exit.enqueue(unit);
            state = self.kernel_wait(state);
        };

        let pcb = state.pcb_mut(caller);
        pcb.children.remove(&zombie);
        pcb.exited_children.retain(|&pid| pid != zombie);
        let status = match state.procs.remove(zombie) {
            Some(reaped) => reaped.exitval,
            None => panic!("zombie {} has no PCB", zombie),
        };

        log::debug!("{} reaped {} (status {})", caller, zombie, status);
        Ok((zombie, status))
    }
}
