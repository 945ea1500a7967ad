//! Units and the table that bounds them
//!
//! A unit is an independently scheduled task running producer or consumer
//! logic. It occupies a slot in the [`UnitTable`] from spawn until the
//! coordinator reaps it, mirroring a process table entry that lives until
//! `waitpid`.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{SpawnError, WaitError};
use crate::idgen::{IdGen, Pid};

/// Exit code of a unit that finished its work
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code of a producer whose write moved less than a full message
pub const EXIT_TRANSFER_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "Producer"),
            Self::Consumer => write!(f, "Consumer"),
        }
    }
}

/// What the coordinator remembers about a spawned unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRecord {
    pub pid: Pid,
    pub role: Role,
    /// 0-based pair index
    pub pair: usize,
}

/// How a unit terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Returned normally with this code
    Exited(i32),
    /// Terminated without an exit code (panicked)
    Abnormal,
}

impl ExitStatus {
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(EXIT_SUCCESS))
    }

    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Abnormal => None,
        }
    }
}

/// Bounded table of live units
#[derive(Debug)]
pub struct UnitTable {
    live: AtomicUsize,
    limit: usize,
    idgen: IdGen,
}

impl UnitTable {
    #[must_use]
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicUsize::new(0),
            limit,
            idgen: IdGen::new(),
        })
    }

    /// Start a new unit running the future `body` builds from its pid
    ///
    /// On failure `body` is dropped uncalled, which releases everything it
    /// captured (in particular its pipe end).
    ///
    /// # Errors
    /// Returns [`SpawnError`] when `limit` units are already alive.
    pub fn spawn<B, F>(
        self: &Arc<Self>,
        role: Role,
        pair: usize,
        body: B,
    ) -> Result<Unit, SpawnError>
    where
        B: FnOnce(Pid) -> F,
        F: Future<Output = i32> + Send + 'static,
    {
        let reserved = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.limit).then_some(live + 1)
            });
        if reserved.is_err() {
            warn!(%role, pair, limit = self.limit, "unit table full");
            return Err(SpawnError {
                role,
                limit: self.limit,
            });
        }

        let record = UnitRecord {
            pid: self.idgen.get_next(),
            role,
            pair,
        };
        debug!(pid = %record.pid, %role, pair, "spawning unit");

        Ok(Unit {
            record,
            join: tokio::spawn(body(record.pid)),
            slot: Slot {
                table: Arc::clone(self),
            },
        })
    }

    /// Units spawned and not yet reaped
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// Table slot held until the unit is reaped
#[derive(Debug)]
struct Slot {
    table: Arc<UnitTable>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.table.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle to a running unit
///
/// Dropping it without [`Unit::wait`] detaches the task; it keeps running
/// and its slot is released.
#[derive(Debug)]
pub struct Unit {
    record: UnitRecord,
    join: JoinHandle<i32>,
    slot: Slot,
}

impl Unit {
    #[must_use]
    pub fn record(&self) -> UnitRecord {
        self.record
    }

    #[must_use]
    pub fn pid(&self) -> Pid {
        self.record.pid
    }

    /// Wait for the unit to terminate and release its slot
    ///
    /// # Errors
    /// Returns [`WaitError`] when the task was cancelled and produced no
    /// status at all.
    pub async fn wait(self) -> Result<ExitStatus, WaitError> {
        let Self { record, join, slot } = self;
        let result = join.await;
        drop(slot);

        match result {
            Ok(code) => Ok(ExitStatus::Exited(code)),
            Err(e) if e.is_panic() => {
                warn!(pid = %record.pid, role = %record.role, "unit panicked");
                Ok(ExitStatus::Abnormal)
            }
            Err(e) => Err(WaitError {
                reason: e.to_string(),
            }),
        }
    }

    /// Cancel the unit. If it had not finished yet, [`Unit::wait`] then
    /// reports a [`WaitError`].
    pub fn abort(&self) {
        self.join.abort();
    }
}
