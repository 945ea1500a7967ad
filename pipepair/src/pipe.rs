//! Bounded unidirectional pipe with async coordination
//!
//! Implements a POSIX-style pipe where:
//! - Writers append to a fixed-capacity shared buffer
//! - One Reader drains the buffer in write order
//! - Coordination via `tokio::sync::Notify` (wait when empty or full)
//!
//! Each end holds one descriptor from a [`DescriptorTable`], so creating a
//! pipe can fail with descriptor exhaustion just like `pipe(2)`.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::fdtable::{Descriptor, DescriptorTable, DescriptorsExhausted};

/// Default pipe capacity in bytes
pub const DEFAULT_PIPE_CAPACITY: usize = 4096;

/// Shared state between the write-end copies and the read end
struct SharedBuffer {
    buffer: VecDeque<u8>,
    capacity: usize,
    writers: usize,
    reader_open: bool,
}

struct Shared {
    state: Mutex<SharedBuffer>,
    /// Woken when data arrives or the last writer goes away
    readable: Notify,
    /// Woken when space frees up or the reader goes away
    writable: Notify,
}

/// Write end of the pipe
///
/// Several copies may exist (see [`Writer::try_clone`]); the reader sees
/// end-of-stream only after every copy is closed.
pub struct Writer {
    shared: Arc<Shared>,
    descriptor: Descriptor,
}

impl Writer {
    /// Write data to the pipe
    ///
    /// A write of at most the pipe capacity is atomic: it waits until there
    /// is room for all of `data`. A larger write transfers what fits and
    /// returns the short count.
    ///
    /// # Errors
    /// Returns `BrokenPipe` when the read end is closed.
    pub async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        loop {
            let notified = self.shared.writable.notified();
            {
                let mut state = self.shared.state.lock();

                if !state.reader_open {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        format!("write on {:?}: read end closed", self.descriptor),
                    ));
                }

                let free = state.capacity - state.buffer.len();
                let fits = data.len() <= free;
                let oversized = data.len() > state.capacity && free > 0;
                if fits || oversized {
                    let n = data.len().min(free);
                    #[allow(clippy::indexing_slicing)]
                    state.buffer.extend(&data[..n]);
                    drop(state);
                    self.shared.readable.notify_waiters();
                    return Ok(n);
                }
            }
            notified.await;
        }
    }

    /// Duplicate this write end. The copy holds its own descriptor.
    ///
    /// # Errors
    /// Fails when the descriptor table is exhausted.
    pub fn try_clone(&self) -> Result<Writer, DescriptorsExhausted> {
        let descriptor = self.descriptor.duplicate()?;
        self.shared.state.lock().writers += 1;
        Ok(Writer {
            shared: Arc::clone(&self.shared),
            descriptor,
        })
    }

    #[must_use]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Close this write-end copy
    pub fn close(self) {
        log::trace!("closing {self:?}");
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        write!(
            f,
            "Pipe.Writer({:?}, buffered={}, writers={}, reader_open={})",
            self.descriptor,
            state.buffer.len(),
            state.writers,
            state.reader_open
        )
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        let last = {
            let mut state = self.shared.state.lock();
            state.writers -= 1;
            state.writers == 0
        };
        if last {
            self.shared.readable.notify_waiters();
        }
    }
}

/// Read end of the pipe
pub struct Reader {
    shared: Arc<Shared>,
    descriptor: Descriptor,
}

impl Reader {
    /// Read data from the pipe
    ///
    /// Waits until data is available or every write end is closed.
    /// Returns the number of bytes copied into `buf`, 0 at end-of-stream.
    ///
    /// # Errors
    /// Reads on an in-memory pipe do not fail today; the `io::Result` keeps
    /// the contract of a real descriptor read.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let notified = self.shared.readable.notified();
            {
                let mut state = self.shared.state.lock();

                if !state.buffer.is_empty() {
                    let n = state.buffer.len().min(buf.len());
                    for (dst, src) in buf.iter_mut().zip(state.buffer.drain(..n)) {
                        *dst = src;
                    }
                    drop(state);
                    self.shared.writable.notify_waiters();
                    return Ok(n);
                }

                if state.writers == 0 {
                    return Ok(0);
                }
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Close the read end. Pending and future writes fail with `BrokenPipe`.
    pub fn close(self) {
        log::trace!("closing {self:?}");
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        write!(
            f,
            "Pipe.Reader({:?}, buffered={}, writers={})",
            self.descriptor,
            state.buffer.len(),
            state.writers
        )
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.shared.state.lock().reader_open = false;
        self.shared.writable.notify_waiters();
    }
}

/// Pipe factory
pub struct Pipe;

impl Pipe {
    /// Create a pipe with the default capacity
    ///
    /// # Errors
    /// Fails when the descriptor table cannot supply two descriptors.
    pub fn create(table: &Arc<DescriptorTable>) -> Result<(Reader, Writer), DescriptorsExhausted> {
        Self::with_capacity(table, DEFAULT_PIPE_CAPACITY)
    }

    /// Create a pipe holding at most `capacity` unread bytes
    ///
    /// # Errors
    /// Fails when the descriptor table cannot supply two descriptors.
    /// A descriptor allocated for the read end is released on that path.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(
        table: &Arc<DescriptorTable>,
        capacity: usize,
    ) -> Result<(Reader, Writer), DescriptorsExhausted> {
        assert!(capacity > 0, "pipe capacity must be positive");

        let read_fd = table.allocate()?;
        let write_fd = table.allocate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(SharedBuffer {
                buffer: VecDeque::with_capacity(capacity),
                capacity,
                writers: 1,
                reader_open: true,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
        });

        let reader = Reader {
            shared: Arc::clone(&shared),
            descriptor: read_fd,
        };
        let writer = Writer {
            shared,
            descriptor: write_fd,
        };
        Ok((reader, writer))
    }
}
