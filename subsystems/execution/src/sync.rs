//! # Condition Variables
//!
//! A condition variable here is just a queue of sleeping units. It lives
//! inside the kernel state, so it is only ever touched with the kernel lock
//! held; releasing the lock around the actual sleep is the job of
//! [`crate::Kernel`].

use crate::scheduler::{Scheduler, UnitId};
use alloc::collections::VecDeque;

/// Wait queue signalled by broadcast
#[derive(Debug, Default)]
pub struct CondVar {
    waiters: VecDeque<UnitId>,
}

impl CondVar {
    /// Create an empty condition variable
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Register `unit` as waiting
    ///
    /// A unit already queued is not queued twice, so a unit that returns
    /// from a spurious wakeup and waits again keeps a single entry.
    pub fn enqueue(&mut self, unit: UnitId) {
        if !self.waiters.contains(&unit) {
            self.waiters.push_back(unit);
        }
    }

    /// Wake every waiting unit, emptying the queue
    ///
    /// Returns the number of units woken.
    pub fn broadcast<S: Scheduler + ?Sized>(&mut self, sched: &S) -> usize {
        let woken = self.waiters.len();
        for unit in self.waiters.drain(..) {
            log::trace!("waking unit {}", unit.as_u64());
            sched.wakeup(unit);
        }
        woken
    }

    /// Number of queued units
    pub fn waiters(&self) -> usize {
        self.waiters.len()
    }

    /// Is anyone waiting?
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::UnitEntry;
    use crate::ExecResult;
    use alloc::vec::Vec;
    use spin::Mutex;

    /// Records wakeups instead of running anything
    struct RecordingScheduler {
        woken: Mutex<Vec<UnitId>>,
    }

    impl Scheduler for RecordingScheduler {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn spawn(&self, _entry: UnitEntry) -> ExecResult<UnitId> {
            Err(crate::ExecError::OutOfResources)
        }

        fn wakeup(&self, unit: UnitId) {
            self.woken.lock().push(unit);
        }

        fn current(&self) -> UnitId {
            UnitId::from_raw(0)
        }

        fn sleep(&self) {}

        fn halt(&self) -> ! {
            panic!("halt on recording scheduler")
        }
    }

    #[test]
    fn test_broadcast_wakes_all_once() {
        let sched = RecordingScheduler { woken: Mutex::new(Vec::new()) };
        let mut cv = CondVar::new();
        cv.enqueue(UnitId::from_raw(1));
        cv.enqueue(UnitId::from_raw(2));
        cv.enqueue(UnitId::from_raw(1));
        assert_eq!(cv.waiters(), 2);

        assert_eq!(cv.broadcast(&sched), 2);
        assert!(cv.is_empty());
        assert_eq!(
            *sched.woken.lock(),
            alloc::vec![UnitId::from_raw(1), UnitId::from_raw(2)]
        );

        assert_eq!(cv.broadcast(&sched), 0);
        assert_eq!(sched.woken.lock().len(), 2);
    }
}
