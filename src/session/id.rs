//! Session identifiers

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random bytes in a session identifier (128 bits)
pub const SESSION_ID_BYTES: usize = 16;

/// Length of the hex-encoded identifier
const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Opaque session identifier
///
/// Hex-encoded random bytes from the operating system CSPRNG. Identifiers are
/// immutable: renewing a session issues a new one instead of changing it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse an identifier received from a client
    ///
    /// Returns `None` for anything that is not exactly 32 hex characters.
    /// Uppercase input is normalised so it maps to the same backing key.
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != SESSION_ID_LEN || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix of the identifier, for log output
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Identifiers are bearer credentials, keep them out of debug output.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({}…)", self.short())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
