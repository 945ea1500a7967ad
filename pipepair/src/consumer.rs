//! Consumer unit: sums integers until end-of-stream, then exits

use tracing::{debug, warn};

use crate::events::{Event, EventSink};
use crate::idgen::Pid;
use crate::message::{decode, MESSAGE_WIDTH};
use crate::pipe::Reader;
use crate::unit::{Role, EXIT_SUCCESS};

#[derive(Debug, Clone)]
pub struct Consumer {
    /// Pair id reported with the final sum
    pub pair: usize,
    pub events: EventSink,
}

impl Consumer {
    /// Run the consumer to completion and return its exit code
    ///
    /// Each iteration issues one read of exactly one message width. Anything
    /// but a full-width read ends the loop: zero bytes (end-of-stream), a
    /// short fragment, or an error all count as end-of-stream.
    pub async fn run(self, pid: Pid, mut reader: Reader) -> i32 {
        self.events.emit(Event::UnitStarted {
            pid,
            role: Role::Consumer,
        });

        let mut buf = [0u8; MESSAGE_WIDTH];
        let mut count = 0usize;
        let mut sum = 0i64;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(%pid, error = %e, "read failed, treating as end-of-stream");
                    break;
                }
            };

            #[allow(clippy::indexing_slicing)]
            let Some(value) = decode(&buf[..n]) else {
                if n > 0 {
                    warn!(%pid, bytes = n, "short read, treating as end-of-stream");
                }
                break;
            };

            count += 1;
            sum += i64::from(value);
            self.events.emit(Event::Received {
                pid,
                value,
                running_sum: sum,
            });
        }

        self.events.emit(Event::FinalSum {
            pid,
            pair: self.pair,
            count,
            sum,
        });
        reader.close();
        debug!(%pid, count, sum, "consumer done");
        EXIT_SUCCESS
    }
}
