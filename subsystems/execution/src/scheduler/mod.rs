//! # Scheduler Interface
//!
//! The kernel does not schedule anything itself. It asks a scheduler, through
//! the [`Scheduler`] trait, for execution units bound to entry functions, and
//! tells it when those units become runnable, sleep or halt for good.

pub mod traits;

use alloc::boxed::Box;

pub use traits::*;

/// Execution unit identifier
///
/// Names a TCB owned by the scheduler. The kernel only uses it to bind the
/// unit to a thread and to queue it on condition variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
    /// Create from raw value
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Entry function of an execution unit
///
/// Runs once, on the unit, the first time the unit is woken up.
pub type UnitEntry = Box<dyn FnOnce() + Send + 'static>;
