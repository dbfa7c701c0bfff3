//! # File Tables
//!
//! Each process owns a fixed-size table of file ids. A slot holds a shared
//! reference to a [`FileControlBlock`]; dropping a slot's reference is the
//! "decrement reference count" operation. The stream behind a control block
//! is closed when its last reference goes away.

use crate::kernel::Kernel;
use crate::scheduler::Scheduler;
use crate::{ExecError, ExecResult};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// File id, an index into a process's file table
pub type Fid = usize;

/// Operations of the stream behind a file
pub trait StreamOps: Send + Sync {
    /// Called once, when the last reference to the file is dropped
    fn close(&self) {}
}

/// Shared file object
pub struct FileControlBlock {
    stream: Box<dyn StreamOps>,
}

impl FileControlBlock {
    /// Wrap a stream
    pub fn new(stream: Box<dyn StreamOps>) -> Arc<Self> {
        Arc::new(Self { stream })
    }

    /// The underlying stream
    pub fn stream(&self) -> &dyn StreamOps {
        self.stream.as_ref()
    }
}

impl Drop for FileControlBlock {
    fn drop(&mut self) {
        self.stream.close();
    }
}

impl core::fmt::Debug for FileControlBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileControlBlock").finish_non_exhaustive()
    }
}

/// Per-process file id table
#[derive(Debug)]
pub struct FileTable {
    slots: Vec<Option<Arc<FileControlBlock>>>,
}

impl FileTable {
    /// Create an empty table with `size` slots
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        Self { slots }
    }

    /// Copy of `parent` sharing every open file
    pub fn inherit(parent: &FileTable) -> Self {
        Self {
            slots: parent.slots.clone(),
        }
    }

    /// Install `fcb` in the lowest free slot
    pub fn install(&mut self, fcb: Arc<FileControlBlock>) -> ExecResult<Fid> {
        let fid = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ExecError::FileTableFull)?;
        self.slots[fid] = Some(fcb);
        Ok(fid)
    }

    /// Get the file at `fid`
    pub fn get(&self, fid: Fid) -> Option<&Arc<FileControlBlock>> {
        self.slots.get(fid).and_then(Option::as_ref)
    }

    /// Drop the reference held at `fid`
    pub fn close(&mut self, fid: Fid) -> ExecResult<()> {
        self.slots
            .get_mut(fid)
            .and_then(Option::take)
            .map(drop)
            .ok_or(ExecError::BadFileId)
    }

    /// Make `new` refer to the same file as `old`
    pub fn dup2(&mut self, old: Fid, new: Fid) -> ExecResult<()> {
        let fcb = self.get(old).cloned().ok_or(ExecError::BadFileId)?;
        let slot = self.slots.get_mut(new).ok_or(ExecError::BadFileId)?;
        *slot = Some(fcb);
        Ok(())
    }

    /// Drop every reference held by the table
    ///
    /// Returns the number of entries released.
    pub fn release_all(&mut self) -> usize {
        self.slots
            .iter_mut()
            .filter_map(Option::take)
            .count()
    }

    /// Number of open file ids
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Table size
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<S: Scheduler> Kernel<S> {
    /// Open `stream` in the caller's process
    pub fn open_stream(&self, stream: Box<dyn StreamOps>) -> ExecResult<Fid> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let pid = state.binding(unit).pid;
        state.pcb_mut(pid).files.install(FileControlBlock::new(stream))
    }

    /// Close a file id of the caller's process
    pub fn close(&self, fid: Fid) -> ExecResult<()> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let pid = state.binding(unit).pid;
        state.pcb_mut(pid).files.close(fid)
    }

    /// Make `new` refer to the file open at `old`
    pub fn dup2(&self, old: Fid, new: Fid) -> ExecResult<()> {
        let unit = self.scheduler().current();
        let mut state = self.lock();
        let pid = state.binding(unit).pid;
        state.pcb_mut(pid).files.dup2(old, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl StreamOps for Counted {
        fn close(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted() -> (Arc<FileControlBlock>, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (FileControlBlock::new(Box::new(Counted(closes.clone()))), closes)
    }

    #[test]
    fn test_install_lowest_free() {
        let mut table = FileTable::new(3);
        let (a, _) = counted();
        let (b, _) = counted();
        assert_eq!(table.install(a.clone()), Ok(0));
        assert_eq!(table.install(b), Ok(1));
        table.close(0).unwrap();
        assert_eq!(table.install(a), Ok(0));
        assert_eq!(table.open_count(), 2);
    }

    #[test]
    fn test_table_full_and_bad_fid() {
        let mut table = FileTable::new(1);
        let (a, _) = counted();
        table.install(a.clone()).unwrap();
        assert_eq!(table.install(a), Err(ExecError::FileTableFull));
        assert_eq!(table.close(5), Err(ExecError::BadFileId));
        table.close(0).unwrap();
        assert_eq!(table.close(0), Err(ExecError::BadFileId));
    }

    #[test]
    fn test_close_runs_once_on_last_reference() {
        let mut table = FileTable::new(4);
        let (fcb, closes) = counted();
        let fid = table.install(fcb).unwrap();
        table.dup2(fid, 3).unwrap();

        let mut child = FileTable::inherit(&table);
        assert_eq!(child.open_count(), 2);

        table.close(fid).unwrap();
        assert_eq!(table.release_all(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        assert_eq!(child.release_all(), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(child.open_count(), 0);
    }

    #[test]
    fn test_dup2_replaces_target() {
        let mut table = FileTable::new(2);
        let (a, a_closes) = counted();
        let (b, b_closes) = counted();
        table.install(a).unwrap();
        table.install(b).unwrap();
        table.dup2(0, 1).unwrap();
        assert_eq!(b_closes.load(Ordering::SeqCst), 1);
        assert_eq!(a_closes.load(Ordering::SeqCst), 0);
        assert_eq!(table.dup2(1, 9), Err(ExecError::BadFileId));
    }
}
