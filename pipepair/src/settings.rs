use std::time::Duration;

use crate::pipe::DEFAULT_PIPE_CAPACITY;

/// Default pause between two producer sends
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(100);

/// Default number of descriptors a coordinator may hold open
pub const DEFAULT_MAX_DESCRIPTORS: usize = 1024;

/// Default number of units alive at once
pub const DEFAULT_MAX_UNITS: usize = 64;

/// Runtime knobs of a [`crate::Coordinator`]
///
/// Message width, values per producer and the pair cap are compile-time
/// constants in [`crate::message`] and are not part of this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub send_delay: Duration,
    pub max_descriptors: usize,
    pub max_units: usize,
    pub pipe_capacity: usize,
}

impl Settings {
    #[must_use]
    pub fn with_send_delay(mut self, send_delay: Duration) -> Self {
        self.send_delay = send_delay;
        self
    }

    #[must_use]
    pub fn with_max_descriptors(mut self, max_descriptors: usize) -> Self {
        self.max_descriptors = max_descriptors;
        self
    }

    #[must_use]
    pub fn with_max_units(mut self, max_units: usize) -> Self {
        self.max_units = max_units;
        self
    }

    /// # Panics
    /// Panics if `pipe_capacity` is zero.
    #[must_use]
    pub fn with_pipe_capacity(mut self, pipe_capacity: usize) -> Self {
        assert!(pipe_capacity > 0, "pipe capacity must be positive");
        self.pipe_capacity = pipe_capacity;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            send_delay: DEFAULT_SEND_DELAY,
            max_descriptors: DEFAULT_MAX_DESCRIPTORS,
            max_units: DEFAULT_MAX_UNITS,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}
