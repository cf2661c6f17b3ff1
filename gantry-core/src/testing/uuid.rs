//! UUID provider backing the `gen.uuid` generator.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh identifiers.
pub trait UuidProvider: Send + Sync {
    /// Generate a new UUID.
    fn new_v4(&self) -> Uuid;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealUuid;

impl UuidProvider for RealUuid {
    fn new_v4(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Sequential UUIDs: `00000000-0000-0000-0000-000000000001`, then `...02`.
#[derive(Debug)]
pub struct MockUuid {
    next: AtomicU64,
}

impl MockUuid {
    /// Start the sequence at 1.
    pub fn sequential() -> Self {
        Self::sequential_from(1)
    }

    /// Start the sequence at `start`.
    pub fn sequential_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl UuidProvider for MockUuid {
    fn new_v4(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Uuid::from_u64_pair(0, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_uuids() {
        let provider = MockUuid::sequential();
        assert_eq!(provider.new_v4().to_string(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(provider.new_v4().to_string(), "00000000-0000-0000-0000-000000000002");
    }

    #[test]
    fn sequential_from() {
        let provider = MockUuid::sequential_from(100);
        assert_eq!(provider.new_v4().to_string(), "00000000-0000-0000-0000-000000000064");
    }

    #[test]
    fn real_uuid_is_random() {
        assert_ne!(RealUuid.new_v4(), RealUuid.new_v4());
    }
}
