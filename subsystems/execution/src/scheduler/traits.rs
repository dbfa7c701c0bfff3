//! # Scheduler Traits
//!
//! Defines the trait a scheduler implementation must provide to the kernel.

use super::{UnitEntry, UnitId};
use crate::ExecResult;

/// The scheduler collaborator
///
/// All methods except [`Scheduler::spawn`] and [`Scheduler::wakeup`] act on
/// the calling unit. The kernel calls `spawn`, `wakeup` and `current` with the
/// kernel lock held, and `sleep`/`halt` with it released.
pub trait Scheduler: Send + Sync + 'static {
    /// Get the scheduler name
    fn name(&self) -> &'static str;

    /// Create an execution unit bound to `entry`
    ///
    /// The unit must not run until it is first passed to [`Scheduler::wakeup`].
    fn spawn(&self, entry: UnitEntry) -> ExecResult<UnitId>;

    /// Mark a unit runnable
    ///
    /// A wakeup aimed at a unit that is not sleeping yet must not be lost:
    /// its next [`Scheduler::sleep`] returns immediately.
    fn wakeup(&self, unit: UnitId);

    /// The unit executing the caller
    ///
    /// Calling this from outside a unit spawned by this scheduler is a
    /// kernel bug and may panic.
    fn current(&self) -> UnitId;

    /// Block the calling unit until it is woken up
    ///
    /// May return without a matching wakeup. Callers re-check their
    /// condition in a loop.
    fn sleep(&self);

    /// Deschedule the calling unit permanently
    fn halt(&self) -> !;
}
