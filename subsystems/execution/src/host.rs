//! # Host Scheduler
//!
//! A [`Scheduler`] that runs every execution unit on its own host thread.
//! Sleeping and waking map onto thread parking, whose wakeup token makes a
//! wakeup delivered before the sleep stick. Used to run the kernel in tests
//! and hosted tools.

use crate::kernel::Kernel;
use crate::scheduler::{Scheduler, UnitEntry, UnitId};
use crate::{ExecError, ExecResult};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::sync::Arc;
use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;
use static_assertions::assert_impl_all;
use std::thread::{self, Thread};

std::thread_local! {
    static CURRENT: Cell<Option<UnitId>> = const { Cell::new(None) };
}

/// A unit known to the scheduler
#[derive(Debug)]
struct HostUnit {
    /// The host thread running it
    thread: Thread,
    /// Set by the first wakeup
    started: Arc<AtomicBool>,
}

/// Scheduler backed by host threads
#[derive(Debug)]
pub struct HostScheduler {
    /// Next unit ID
    next_unit: AtomicU64,
    /// Units not yet halted
    units: Mutex<BTreeMap<UnitId, HostUnit>>,
}

impl HostScheduler {
    /// Stack size of unit threads
    pub const STACK_SIZE: usize = 256 * 1024;

    /// Create a scheduler with no units
    pub fn new() -> Self {
        Self {
            next_unit: AtomicU64::new(1),
            units: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of units spawned and not yet halted
    pub fn live_units(&self) -> usize {
        self.units.lock().len()
    }
}

impl Default for HostScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for HostScheduler {
    fn name(&self) -> &'static str {
        "host-threads"
    }

    fn spawn(&self, entry: UnitEntry) -> ExecResult<UnitId> {
        let id = UnitId::from_raw(self.next_unit.fetch_add(1, Ordering::Relaxed));
        let started = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&started);

        let handle = thread::Builder::new()
            .name(format!("unit-{}", id.as_u64()))
            .stack_size(Self::STACK_SIZE)
            .spawn(move || {
                CURRENT.with(|current| current.set(Some(id)));
                while !gate.load(Ordering::Acquire) {
                    thread::park();
                }
                entry();
            })
            .map_err(|err| {
                log::error!("cannot spawn host thread for unit {}: {}", id.as_u64(), err);
                ExecError::OutOfResources
            })?;

        self.units.lock().insert(
            id,
            HostUnit {
                thread: handle.thread().clone(),
                started,
            },
        );
        Ok(id)
    }

    fn wakeup(&self, unit: UnitId) {
        match self.units.lock().get(&unit) {
            Some(host) => {
                host.started.store(true, Ordering::Release);
                host.thread.unpark();
            }
            None => log::trace!("wakeup for halted unit {}", unit.as_u64()),
        }
    }

    fn current(&self) -> UnitId {
        match CURRENT.with(Cell::get) {
            Some(unit) => unit,
            None => panic!("not running on a host execution unit"),
        }
    }

    fn sleep(&self) {
        thread::park();
    }

    fn halt(&self) -> ! {
        let unit = self.current();
        self.units.lock().remove(&unit);
        log::trace!("unit {} halted", unit.as_u64());
        loop {
            thread::park();
        }
    }
}

assert_impl_all!(HostScheduler: Send, Sync);
assert_impl_all!(Kernel<HostScheduler>: Send, Sync);
