pub mod consumer;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fdtable;
pub mod idgen;
pub mod message;
pub mod pipe;
pub mod producer;
pub mod settings;
pub mod unit;

// Re-export coordinator types for convenience
pub use coordinator::{clamp_pairs, Coordinator, Reaped, Summary, BASIC_START};

// Re-export error types for convenience
pub use error::{Error, ResourceError, SpawnError, TransferError, WaitError};

// Re-export events
pub use events::{Event, EventSink};

// Re-export pipe and descriptor types
pub use fdtable::{Descriptor, DescriptorTable, DescriptorsExhausted};
pub use pipe::{Pipe, Reader, Writer, DEFAULT_PIPE_CAPACITY};

pub use idgen::{IdGen, Pid};
pub use message::{Message, MAX_PAIRS, MESSAGE_WIDTH, NUM_VALUES};
pub use settings::Settings;
pub use unit::{ExitStatus, Role, Unit, UnitRecord, UnitTable};
