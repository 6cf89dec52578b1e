//! Session identifiers.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of generated session ids.
pub const SESSION_ID_LEN: usize = 9;

/// Opaque id attached to every analytics event of one AR session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random id of nine lowercase base-36 characters.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| char::from_digit(rng.random_range(0..36u32), 36).unwrap_or('0'))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
