//! Observable progress of a run
//!
//! Every component reports what it does (spawn, send, receive, exit) as an
//! [`Event`]. The sink either prints events as progress lines, forwards
//! them to an in-process channel, or drops them.

use std::fmt;

use tokio::sync::mpsc;

use crate::idgen::Pid;
use crate::message::Message;
use crate::unit::{ExitStatus, Role, UnitRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Coordinator is about to start a demo with this many pairs
    Starting { pairs: usize },
    /// Coordinator begins pair `pair` (1-based)
    PairStarting { pair: usize },
    Spawned(UnitRecord),
    UnitStarted { pid: Pid, role: Role },
    Sent { pid: Pid, value: Message },
    ProducerFinished { pid: Pid, count: usize },
    TransferFailed { pid: Pid, reason: String },
    Received { pid: Pid, value: Message, running_sum: i64 },
    FinalSum { pid: Pid, pair: usize, count: usize, sum: i64 },
    Reaped { unit: UnitRecord, status: ExitStatus },
    WaitFailed { unit: UnitRecord, reason: String },
    AllPairsCompleted,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting { pairs } => {
                write!(f, "Parent creating {pairs} producer-consumer pair(s)...")
            }
            Self::PairStarting { pair } => write!(f, "=== Pair {pair} ==="),
            Self::Spawned(unit) => {
                write!(f, "Created {} child (PID: {})", unit.role, unit.pid)
            }
            Self::UnitStarted { pid, role } => write!(f, "{role} (PID: {pid}) starting..."),
            Self::Sent { value, .. } => write!(f, "Producer: Sent number {value}"),
            Self::ProducerFinished { count, .. } => {
                write!(f, "Producer: Finished sending {count} numbers")
            }
            Self::TransferFailed { pid, reason } => {
                write!(f, "Producer (PID: {pid}): {reason}")
            }
            Self::Received {
                value, running_sum, ..
            } => write!(f, "Consumer: Received {value}, running sum: {running_sum}"),
            Self::FinalSum { sum, .. } => write!(f, "Consumer: Final sum: {sum}"),
            Self::Reaped { unit, status } => match status {
                ExitStatus::Exited(code) => write!(
                    f,
                    "{} child (PID: {}) exited with status {code}",
                    unit.role, unit.pid
                ),
                ExitStatus::Abnormal => {
                    write!(f, "{} child (PID: {}) exited abnormally", unit.role, unit.pid)
                }
            },
            Self::WaitFailed { unit, reason } => {
                write!(f, "wait for {} (PID: {}): {reason}", unit.role, unit.pid)
            }
            Self::AllPairsCompleted => write!(f, "All pairs completed successfully!"),
        }
    }
}

#[derive(Debug, Clone)]
enum Target {
    Stdout,
    Channel(mpsc::UnboundedSender<Event>),
    Discard,
}

/// Destination of [`Event`]s, cheap to clone into every unit
#[derive(Debug, Clone)]
pub struct EventSink {
    target: Target,
}

impl EventSink {
    /// Print each event as one line on stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            target: Target::Stdout,
        }
    }

    /// Forward events to the returned receiver
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                target: Target::Channel(tx),
            },
            rx,
        )
    }

    #[must_use]
    pub fn discard() -> Self {
        Self {
            target: Target::Discard,
        }
    }

    pub fn emit(&self, event: Event) {
        tracing::trace!(?event, "event");
        match &self.target {
            Target::Stdout => println!("{event}"),
            Target::Channel(tx) => {
                // Receiver gone means nobody is listening any more
                let _ = tx.send(event);
            }
            Target::Discard => {}
        }
    }
}
