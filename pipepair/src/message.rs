//! Fixed-width integer records exchanged over a pipe
//!
//! No header and no framing: a reader relies on its read size matching the
//! writer's write size.

/// Integer carried by one message
pub type Message = i32;

/// Width of one message in bytes
pub const MESSAGE_WIDTH: usize = std::mem::size_of::<Message>();

/// Number of values every producer emits
pub const NUM_VALUES: usize = 5;

/// Upper bound on pairs in the multi-pair demo
pub const MAX_PAIRS: usize = 5;

#[must_use]
pub fn encode(value: Message) -> [u8; MESSAGE_WIDTH] {
    value.to_ne_bytes()
}

/// Decode a full-width record. Anything shorter or longer is not a message.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<Message> {
    let bytes: [u8; MESSAGE_WIDTH] = bytes.try_into().ok()?;
    Some(Message::from_ne_bytes(bytes))
}

/// Sum a consumer paired with a producer starting at `start` ends up with
#[must_use]
pub fn expected_sum(start: Message) -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    let n = NUM_VALUES as i64;
    n * i64::from(start) + n * (n - 1) / 2
}

/// First value the producer of pair `index` (0-based) emits
#[must_use]
pub fn pair_start(index: usize) -> Message {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let start = (index * NUM_VALUES + 1) as Message;
    start
}
