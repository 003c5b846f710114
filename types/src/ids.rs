use std::fmt;

/// Opaque identity of one in-flight asynchronous operation.
///
/// Identities are assigned by the tracking layer from a monotonic counter and
/// are never reused within a process lifetime. Application code treats them
/// as opaque handles: comparable, hashable, printable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OperationId(u64);

impl OperationId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
