//! Declared checksums and streaming artifact hashing.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded digest declared by the sender for the fully reassembled
/// artifact.
///
/// The value is preserved verbatim as it appeared on the wire; comparisons
/// against a computed digest are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredChecksum(String);

impl DeclaredChecksum {
    /// Parse a declared checksum: a nonempty, even-length hex string.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() || s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MetadataMalformed(format!(
                "invalid checksum segment: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Check a computed hex digest against the declared value.
    pub fn matches(&self, actual_hex: &str) -> bool {
        self.0.eq_ignore_ascii_case(actual_hex)
    }

    /// Get the declared value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeclaredChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental SHA-256 hasher for artifact contents.
pub struct ArtifactHasher(Sha256);

impl ArtifactHasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        self.0.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Default for ArtifactHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the hex digest of a byte slice.
pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = ArtifactHasher::new();
    hasher.update(data);
    hasher.finalize_hex()
}
