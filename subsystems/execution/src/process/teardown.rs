//! # Process Teardown
//!
//! Run by the last thread of a process on its way out, with the kernel lock
//! held. Hands children over to init, reports this process to its parent,
//! then releases everything the process still owns.

use super::ProcessState;
use crate::kernel::KernelState;
use crate::scheduler::Scheduler;
use crate::ProcessId;
use core::mem;

impl KernelState {
    /// Turn `pid` into a zombie
    ///
    /// `pid` must have no threads left. Leftover children after re-parenting
    /// mean the hierarchy is corrupt, which is fatal.
    pub(crate) fn teardown_process<S: Scheduler + ?Sized>(&mut self, pid: ProcessId, sched: &S) {
        debug_assert_eq!(self.pcb(pid).thread_count, 0);

        if !pid.is_init() {
            self.reparent_children(pid, sched);

            let parent = match self.pcb(pid).parent {
                Some(parent) => parent,
                None => panic!("{} has no parent", pid),
            };
            let ppcb = self.pcb_mut(parent);
            ppcb.exited_children.push_back(pid);
            ppcb.child_exit.broadcast(sched);
        }

        let pcb = self.pcb_mut(pid);
        assert!(pcb.children.is_empty(), "{} still has children", pid);
        assert!(pcb.exited_children.is_empty(), "{} still has zombie children", pid);

        let ptcbs = mem::take(&mut pcb.ptcbs);
        let swept = ptcbs.len();
        for tid in ptcbs {
            if let Some(ptcb) = self.threads.remove(tid) {
                if ptcb.refcount() > 0 {
                    log::warn!("{} swept with {} joiners registered", tid, ptcb.refcount());
                }
            }
        }

        let pcb = self.pcb_mut(pid);
        pcb.args = None;
        let closed = pcb.files.release_all();
        pcb.main_thread = None;
        pcb.state = ProcessState::Zombie;

        log::info!(
            "{} is a zombie ({} PTCBs swept, {} files closed)",
            pid,
            swept,
            closed
        );
    }

    /// Give every child of `pid` to init
    ///
    /// Zombie children go onto init's exited list, and init is woken to reap
    /// them.
    fn reparent_children<S: Scheduler + ?Sized>(&mut self, pid: ProcessId, sched: &S) {
        let pcb = self.pcb_mut(pid);
        let children = mem::take(&mut pcb.children);
        let mut exited = mem::take(&mut pcb.exited_children);

        for &child in &children {
            self.pcb_mut(child).parent = Some(ProcessId::INIT);
        }

        let init = self.pcb_mut(ProcessId::INIT);
        if !children.is_empty() {
            log::debug!("{} children of {} handed to init", children.len(), pid);
        }
        init.children.extend(children);
        if !exited.is_empty() {
            init.exited_children.append(&mut exited);
            init.child_exit.broadcast(sched);
        }
    }
}
