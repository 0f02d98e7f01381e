//! Process-wide instance identity.

use std::fmt;
use uuid::Uuid;

/// Random identity generated once per running instance.
///
/// Every staged filename is prefixed with this identity so multiple
/// independently configured instances can share one staging directory
/// without collision, and so the sweeper only ever touches files it owns.
/// The identity is never persisted: restarting an instance orphans its
/// previously staged files until they pass the expiration window.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// Generate a new random instance identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string().to_uppercase())
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
