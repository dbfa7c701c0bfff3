//! # Kernel Configuration

use static_assertions::const_assert;

/// Configuration for a kernel instance
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Number of process slots, including the reserved kernel slot 0
    pub max_processes: usize,
    /// Number of file ids per process
    pub max_fileid: usize,
}

impl KernelConfig {
    /// Default process table size
    pub const DEFAULT_MAX_PROCESSES: usize = 65536;
    /// Default file table size
    pub const DEFAULT_MAX_FILEID: usize = 16;

    /// Create default configuration
    pub fn new() -> Self {
        Self {
            max_processes: Self::DEFAULT_MAX_PROCESSES,
            max_fileid: Self::DEFAULT_MAX_FILEID,
        }
    }

    /// A configuration with small tables, handy for exhaustion tests
    pub fn small() -> Self {
        Self {
            max_processes: 8,
            max_fileid: 4,
        }
    }

    /// Set the process table size
    pub fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = max_processes;
        self
    }

    /// Set the file table size
    pub fn with_max_fileid(mut self, max_fileid: usize) -> Self {
        self.max_fileid = max_fileid;
        self
    }

    /// Number of pids that can actually be handed out
    ///
    /// Slot 0 belongs to the kernel and is never allocated.
    pub fn usable_pids(&self) -> usize {
        self.max_processes.saturating_sub(1)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

// Room for the kernel slot plus init.
const_assert!(KernelConfig::DEFAULT_MAX_PROCESSES >= 2);
const_assert!(KernelConfig::DEFAULT_MAX_FILEID > 0);
