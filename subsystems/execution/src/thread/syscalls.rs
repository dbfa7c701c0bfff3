//! # Thread System Calls
//!
//! Create, self, join, detach and exit. Each runs on the calling unit with
//! the kernel lock held, except while a joiner sleeps and after an exiting
//! thread has finished its bookkeeping.
//!
//! ## Join/detach protocol
//!
//! A joiner registers interest by bumping the target's refcount, then waits
//! on the target's exit condition until the thread has exited or has been
//! detached. Exit stores the exit value before broadcasting, so any joiner
//! that sees the thread exited reads the final value. The last joiner to
//! leave releases the PTCB; a PTCB nobody joins is released when its process
//! is torn down.

use crate::kernel::{Kernel, Task, UnitBinding};
use crate::scheduler::Scheduler;
use crate::{ExecError, ExecResult, ThreadId};
use alloc::boxed::Box;
use alloc::sync::Arc;

impl<S: Scheduler> Kernel<S> {
    /// Create a thread in the caller's process
    ///
    /// The new thread runs `task` with a copy of `args` and exits with its
    /// return value. It is registered with its process before it can run.
    pub fn create_thread(self: &Arc<Self>, task: Task<S>, args: &[u8]) -> ExecResult<ThreadId> {
        let mut state = self.lock();
        let caller = state.binding(self.scheduler().current());

        let tid = state.threads.reserve();
        let kernel = Arc::clone(self);
        let args = args.to_vec();
        let unit = self.scheduler().spawn(Box::new(move || {
            kernel.run_thread(task, args);
        }))?;

        state.threads.insert(tid, caller.pid, unit);
        let pcb = state.pcb_mut(caller.pid);
        pcb.ptcbs.insert(tid);
        pcb.thread_count += 1;
        state.units.insert(unit, UnitBinding { pid: caller.pid, tid });
        state.check_thread_accounting(caller.pid);

        log::debug!("{} created {} in {}", caller.tid, tid, caller.pid);
        self.scheduler().wakeup(unit);
        Ok(tid)
    }

    /// The calling thread's ID
    pub fn thread_self(&self) -> ThreadId {
        let unit = self.scheduler().current();
        self.lock().binding(unit).tid
    }

    /// Wait for a thread of the caller's process to exit
    ///
    /// On success the exit value is stored in `exitval`, if given. Fails
    /// immediately for unknown threads, self-joins and detached threads, and
    /// fails with [`ExecError::DetachedWhileJoining`] if the thread is
    /// detached while the caller waits.
    pub fn thread_join(&self, tid: ThreadId, exitval: Option<&mut i32>) -> ExecResult<()> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let caller = state.binding(unit);

        if !state.pcb(caller.pid).owns_thread(tid) {
            return Err(ExecError::UnknownThread);
        }
        if caller.tid == tid {
            return Err(ExecError::SelfJoin);
        }
        let target = state.ptcb_mut(tid);
        if target.is_detached() {
            return Err(ExecError::AlreadyDetached);
        }
        target.acquire();

        // The PTCB cannot be released while we hold a reference: the join
        // path waits for refcount zero, and teardown needs this thread gone.
        loop {
            let target = state.ptcb_mut(tid);
            if target.is_exited() || target.is_detached() {
                break;
            }
            target.exit_cv.enqueue(unit);
            log::trace!("{} waiting on {}", caller.tid, tid);
            state = self.kernel_wait(state);
        }

        let target = state.ptcb_mut(tid);
        let remaining = target.release();
        if target.is_detached() {
            log::debug!("{} lost join on {} to detach", caller.tid, tid);
            return Err(ExecError::DetachedWhileJoining);
        }
        let value = match target.exitval() {
            Some(value) => value,
            None => unreachable!("{} woke from join on a running thread", caller.tid),
        };
        if let Some(out) = exitval {
            *out = value;
        }
        if remaining == 0 {
            state.release_ptcb(caller.pid, tid);
        }

        log::debug!("{} joined {} (exit value {})", caller.tid, tid, value);
        Ok(())
    }

    /// Make a thread of the caller's process unjoinable
    ///
    /// Threads blocked joining it wake up and fail. The PTCB stays with the
    /// process until the process is torn down.
    pub fn thread_detach(&self, tid: ThreadId) -> ExecResult<()> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let caller = state.binding(unit);

        if !state.pcb(caller.pid).owns_thread(tid) {
            return Err(ExecError::UnknownThread);
        }
        let target = state.ptcb_mut(tid);
        if target.is_exited() {
            return Err(ExecError::AlreadyExited);
        }
        if target.is_detached() {
            return Err(ExecError::AlreadyDetached);
        }

        target.mark_detached();
        let woken = target.exit_cv.broadcast(self.scheduler());
        log::debug!("{} detached {} ({} joiners woken)", caller.tid, tid, woken);
        Ok(())
    }

    /// Terminate the calling thread
    ///
    /// Publishes `exitval` to joiners. If this was the last thread of its
    /// process, the process is torn down and becomes a zombie.
    pub fn thread_exit(&self, exitval: i32) -> ! {
        let unit = self.scheduler().current();
        {
            let mut state = self.lock();
            let caller = state.binding(unit);

            let ptcb = state.ptcb_mut(caller.tid);
            ptcb.mark_exited(exitval);
            let woken = ptcb.exit_cv.broadcast(self.scheduler());
            log::debug!(
                "{} exited with {} ({} joiners woken)",
                caller.tid,
                exitval,
                woken
            );

            state.units.remove(&unit);
            let pcb = state.pcb_mut(caller.pid);
            pcb.thread_count -= 1;
            let remaining = pcb.thread_count;
            state.check_thread_accounting(caller.pid);

            if remaining == 0 {
                state.teardown_process(caller.pid, self.scheduler());
            }
        }
        self.scheduler().halt()
    }
}
