//! Producer unit: sends `NUM_VALUES` consecutive integers, then exits

use std::time::Duration;

use tracing::{debug, error};

use crate::error::TransferError;
use crate::events::{Event, EventSink};
use crate::idgen::Pid;
use crate::message::{encode, Message, MESSAGE_WIDTH, NUM_VALUES};
use crate::pipe::Writer;
use crate::unit::{Role, EXIT_SUCCESS, EXIT_TRANSFER_FAILURE};

/// Everything a producer needs besides its pipe end
#[derive(Debug, Clone)]
pub struct Producer {
    pub start: Message,
    pub delay: Duration,
    pub events: EventSink,
}

impl Producer {
    /// Run the producer to completion and return its exit code
    pub async fn run(self, pid: Pid, mut writer: Writer) -> i32 {
        self.events.emit(Event::UnitStarted {
            pid,
            role: Role::Producer,
        });

        for value in (self.start..).take(NUM_VALUES) {
            if let Err(e) = send(&mut writer, value).await {
                error!(%pid, value, error = %e, "producer transfer failed");
                self.events.emit(Event::TransferFailed {
                    pid,
                    reason: e.to_string(),
                });
                return EXIT_TRANSFER_FAILURE;
            }
            self.events.emit(Event::Sent { pid, value });

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.events.emit(Event::ProducerFinished {
            pid,
            count: NUM_VALUES,
        });
        writer.close();
        debug!(%pid, "producer done");
        EXIT_SUCCESS
    }
}

/// One discrete write of exactly one message
async fn send(writer: &mut Writer, value: Message) -> Result<(), TransferError> {
    let written = writer.write(&encode(value)).await?;
    if written != MESSAGE_WIDTH {
        return Err(TransferError::Short {
            written,
            expected: MESSAGE_WIDTH,
        });
    }
    Ok(())
}
