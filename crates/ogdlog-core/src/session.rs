//! Session state and session identifier generation

use chrono::{Datelike, Local, Timelike};
use rand::Rng;
use serde_json::Value;

/// Numeric session identifier
pub type SessionId = u64;

/// Number of random digits appended after the date/time fields
const RANDOM_DIGITS: usize = 5;

fn accumulate(acc: u64, input: u64, multiplier: u64) -> u64 {
    acc * multiplier + input % multiplier
}

/// Generate a 17-digit session identifier from the local clock plus randomness.
///
/// Collisions are possible in principle; in practice two clients would have to
/// start within the same second and draw the same five digits.
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::thread_rng();
    let mut digits = [0u8; RANDOM_DIGITS];
    for digit in &mut digits {
        *digit = rng.gen_range(0..10);
    }
    session_id_from_parts(&Local::now(), digits)
}

/// Fold date/time fields and random digits into a session identifier.
///
/// Date fields are folded in base 100 (year, zero-based month, day, hour,
/// minute, second), then each digit in base 10.
pub fn session_id_from_parts<T>(now: &T, digits: [u8; RANDOM_DIGITS]) -> SessionId
where
    T: Datelike + Timelike,
{
    let fields = [
        now.year().unsigned_abs() as u64,
        now.month0() as u64,
        now.day() as u64,
        now.hour() as u64,
        now.minute() as u64,
        now.second() as u64,
    ];

    let id = fields
        .into_iter()
        .fold(0, |acc, field| accumulate(acc, field, 100));
    digits
        .into_iter()
        .fold(id, |acc, digit| accumulate(acc, digit as u64, 10))
}

/// Mutable per-session state: identity of the player and the event counter.
///
/// Owned by the logger and passed by reference to the endpoint builder and
/// event formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    user_id: Option<String>,
    user_data: Option<Value>,
    next_sequence_index: u64,
}

impl Session {
    /// Start a session with a freshly generated identifier
    pub fn new() -> Self {
        Self::with_id(generate_session_id())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            user_id: None,
            user_data: None,
            next_sequence_index: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_data(&self) -> Option<&Value> {
        self.user_data.as_ref()
    }

    /// User data in the string form used on the wire: strings as-is,
    /// anything else as JSON.
    pub fn user_data_string(&self) -> Option<String> {
        self.user_data.as_ref().map(stringify_value)
    }

    /// Replace the user identity. Returns `false` when nothing changed.
    pub fn set_user(&mut self, user_id: Option<String>, user_data: Option<Value>) -> bool {
        if self.user_id == user_id && self.user_data == user_data {
            return false;
        }
        self.user_id = user_id;
        self.user_data = user_data;
        true
    }

    /// Sequence index the next event will receive
    pub fn next_sequence_index(&self) -> u64 {
        self.next_sequence_index
    }

    /// Consume the current sequence index
    pub fn advance_sequence(&mut self) -> u64 {
        let index = self.next_sequence_index;
        self.next_sequence_index += 1;
        index
    }

    /// Start a new session: fresh identifier, counter back to zero.
    /// The user identity carries over.
    pub fn reset(&mut self) -> SessionId {
        self.reset_with_id(generate_session_id())
    }

    pub fn reset_with_id(&mut self, id: SessionId) -> SessionId {
        self.id = id;
        self.next_sequence_index = 0;
        id
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
