//! Bounded descriptor table
//!
//! Every open pipe end owns one [`Descriptor`]. Numbers are handed out
//! lowest-free-first, the way a POSIX kernel assigns file descriptors, and
//! the table refuses new allocations once `limit` descriptors are open.

use std::collections::BTreeSet;
use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use parking_lot::Mutex;

/// Raised when the table has no free descriptor left (EMFILE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("too many open descriptors (limit {limit})")]
pub struct DescriptorsExhausted {
    pub limit: usize,
}

/// Table of open descriptor numbers, shared by all pipes of a coordinator
pub struct DescriptorTable {
    open: Mutex<BTreeSet<c_int>>,
    limit: usize,
}

impl DescriptorTable {
    #[must_use]
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(BTreeSet::new()),
            limit,
        })
    }

    /// Allocate the lowest free descriptor number
    ///
    /// # Errors
    /// Returns [`DescriptorsExhausted`] when `limit` descriptors are already open.
    pub fn allocate(self: &Arc<Self>) -> Result<Descriptor, DescriptorsExhausted> {
        let mut open = self.open.lock();
        if open.len() >= self.limit {
            return Err(DescriptorsExhausted { limit: self.limit });
        }

        // The set is sorted, so the first gap is the lowest free number
        let mut fd: c_int = 0;
        for &taken in open.iter() {
            if taken != fd {
                break;
            }
            fd += 1;
        }
        open.insert(fd);

        Ok(Descriptor {
            fd,
            table: Arc::clone(self),
        })
    }

    /// Number of descriptors currently open
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.lock().len()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn release(&self, fd: c_int) {
        if !self.open.lock().remove(&fd) {
            log::warn!("descriptor {fd} released twice");
        }
    }
}

impl fmt::Debug for DescriptorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DescriptorTable(open={}, limit={})",
            self.open_count(),
            self.limit
        )
    }
}

/// An allocated descriptor number. Released back to its table on drop.
pub struct Descriptor {
    fd: c_int,
    table: Arc<DescriptorTable>,
}

impl Descriptor {
    #[must_use]
    pub fn fd(&self) -> c_int {
        self.fd
    }

    /// Allocate another descriptor from the same table (dup)
    ///
    /// # Errors
    /// Returns [`DescriptorsExhausted`] when the table is full.
    pub fn duplicate(&self) -> Result<Descriptor, DescriptorsExhausted> {
        self.table.allocate()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.fd)
    }
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        self.table.release(self.fd);
    }
}
