//! Coordinator - spawns producer/consumer pairs and reaps them
//!
//! The coordinator owns the descriptor table and the unit table. For every
//! pair it creates a pipe, hands the write end to a producer and the read
//! end to a consumer, and keeps no copy of either end for itself. Then it
//! waits for every unit in spawn order.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::consumer::Consumer;
use crate::error::{Error, ResourceError, SpawnError};
use crate::events::{Event, EventSink};
use crate::fdtable::DescriptorTable;
use crate::message::{pair_start, Message, MAX_PAIRS};
use crate::pipe::{Pipe, Reader, Writer};
use crate::producer::Producer;
use crate::settings::Settings;
use crate::unit::{ExitStatus, Role, Unit, UnitRecord, UnitTable};

/// Start value of the producer in the single-pair demo
pub const BASIC_START: Message = 1;

/// One reaped unit. `status` is `None` when its termination could not be
/// observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaped {
    pub unit: UnitRecord,
    pub status: Option<ExitStatus>,
}

/// Outcome of a successful demo run, in spawn order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub reaped: Vec<Reaped>,
}

impl Summary {
    /// Every unit was observed and exited with status 0
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.reaped
            .iter()
            .all(|r| r.status.is_some_and(|s| s.success()))
    }
}

pub struct Coordinator {
    settings: Settings,
    descriptors: Arc<DescriptorTable>,
    units: Arc<UnitTable>,
    events: EventSink,
}

impl Coordinator {
    #[must_use]
    pub fn new(settings: Settings, events: EventSink) -> Self {
        let descriptors = DescriptorTable::new(settings.max_descriptors);
        let units = UnitTable::new(settings.max_units);
        Self {
            settings,
            descriptors,
            units,
            events,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Descriptors held by pipe ends that are still open anywhere
    #[must_use]
    pub fn open_descriptors(&self) -> usize {
        self.descriptors.open_count()
    }

    /// Units spawned and not yet reaped
    #[must_use]
    pub fn live_units(&self) -> usize {
        self.units.live_count()
    }

    /// One producer (values 1..=5) and one consumer over a single pipe
    ///
    /// # Errors
    /// [`Error::Resource`] if the pipe cannot be created (nothing is
    /// spawned), [`Error::Spawn`] if either unit cannot be started. When the
    /// consumer fails to start, the producer is reaped before returning.
    pub async fn run_basic_demo(&self) -> Result<Summary, Error> {
        self.events.emit(Event::Starting { pairs: 1 });

        let (reader, writer) = self.open_pipe()?;

        let producer = self.spawn_producer(writer, BASIC_START, 0)?;
        self.events.emit(Event::Spawned(producer.record()));

        let consumer = match self.spawn_consumer(reader, 0, 0) {
            Ok(consumer) => consumer,
            Err(e) => {
                // The read end went down with the failed spawn, so the
                // producer's next write fails and it exits on its own
                self.reap(producer).await;
                return Err(e.into());
            }
        };
        self.events.emit(Event::Spawned(consumer.record()));

        let mut summary = Summary::default();
        for unit in [producer, consumer] {
            summary.reaped.push(self.reap(unit).await);
        }
        Ok(summary)
    }

    /// `requested` pairs, each over its own pipe, clamped to `[0, MAX_PAIRS]`
    ///
    /// Pair `i` (0-based) produces `i*NUM_VALUES+1 ..= (i+1)*NUM_VALUES` and
    /// its consumer reports pair id `i+1`.
    ///
    /// # Errors
    /// Aborts on the first pipe or spawn failure. Units of earlier pairs are
    /// left running detached and are not reaped.
    pub async fn run_multiple_pairs(&self, requested: i32) -> Result<Summary, Error> {
        let count = clamp_pairs(requested);
        if usize::try_from(requested).ok() != Some(count) {
            debug!(requested, count, "pair count clamped");
        }
        self.events.emit(Event::Starting { pairs: count });

        let mut units: Vec<Unit> = Vec::with_capacity(count * 2);
        for index in 0..count {
            self.events.emit(Event::PairStarting { pair: index + 1 });

            let (reader, writer) = self.open_pipe()?;

            let producer = self.spawn_producer(writer, pair_start(index), index)?;
            self.events.emit(Event::Spawned(producer.record()));
            units.push(producer);

            let consumer = self.spawn_consumer(reader, index, index + 1)?;
            self.events.emit(Event::Spawned(consumer.record()));
            units.push(consumer);
        }

        let mut summary = Summary::default();
        for unit in units {
            summary.reaped.push(self.reap(unit).await);
        }

        self.events.emit(Event::AllPairsCompleted);
        info!(pairs = count, units = summary.reaped.len(), "all pairs completed");
        Ok(summary)
    }

    fn open_pipe(&self) -> Result<(Reader, Writer), ResourceError> {
        Pipe::with_capacity(&self.descriptors, self.settings.pipe_capacity).map_err(|e| {
            warn!(error = %e, open = self.descriptors.open_count(), "pipe creation failed");
            ResourceError::from(e)
        })
    }

    /// Start a producer that owns `writer` and nothing else
    fn spawn_producer(
        &self,
        writer: Writer,
        start: Message,
        pair: usize,
    ) -> Result<Unit, SpawnError> {
        let producer = Producer {
            start,
            delay: self.settings.send_delay,
            events: self.events.clone(),
        };
        self.units
            .spawn(Role::Producer, pair, move |pid| producer.run(pid, writer))
    }

    /// Start a consumer that owns `reader` and nothing else
    fn spawn_consumer(
        &self,
        reader: Reader,
        pair: usize,
        pair_id: usize,
    ) -> Result<Unit, SpawnError> {
        let consumer = Consumer {
            pair: pair_id,
            events: self.events.clone(),
        };
        self.units
            .spawn(Role::Consumer, pair, move |pid| consumer.run(pid, reader))
    }

    /// Wait for `unit` and report how it ended. Never fails.
    async fn reap(&self, unit: Unit) -> Reaped {
        let record = unit.record();
        match unit.wait().await {
            Ok(status) => {
                debug!(pid = %record.pid, role = %record.role, ?status, "unit reaped");
                self.events.emit(Event::Reaped {
                    unit: record,
                    status,
                });
                Reaped {
                    unit: record,
                    status: Some(status),
                }
            }
            Err(e) => {
                warn!(pid = %record.pid, role = %record.role, error = %e, "wait failed");
                self.events.emit(Event::WaitFailed {
                    unit: record,
                    reason: e.to_string(),
                });
                Reaped {
                    unit: record,
                    status: None,
                }
            }
        }
    }
}

/// Clamp a requested pair count into `[0, MAX_PAIRS]`
#[must_use]
pub fn clamp_pairs(requested: i32) -> usize {
    usize::try_from(requested).map_or(0, |n| n.min(MAX_PAIRS))
}
