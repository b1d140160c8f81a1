//! # Handle Table
//!
//! An arena mapping small integer handles to worker-local instances; the sole
//! authority on instance lifetime inside the worker.
//!
//! ## Invariants
//!
//! - Handles are allocated monotonically starting at 1 and never reused, even
//!   after release, so a stale handle fails instead of aliasing a newer
//!   instance.
//! - The table does no reference counting: exactly one `allocate` pairs with
//!   exactly one `release`. Failing to release leaks the instance for the
//!   life of the worker.

use std::collections::BTreeMap;

use listwire::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The handle is absent from the table: stale, fabricated, or already
    /// released.
    InvalidHandle(Handle),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle(handle) => write!(f, "invalid handle: {}", handle),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Arena of live instances keyed by handle.
pub struct HandleTable<T> {
    entries: BTreeMap<u64, T>,
    next: u64,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 1,
        }
    }

    /// Stores an instance and returns its freshly allocated handle.
    pub fn allocate(&mut self, instance: T) -> Handle {
        let value = self.next;
        self.next += 1;
        self.entries.insert(value, instance);
        Handle::from(value)
    }

    pub fn resolve(&self, handle: Handle) -> Result<&T> {
        self.entries
            .get(&handle.value())
            .ok_or(Error::InvalidHandle(handle))
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.entries
            .get_mut(&handle.value())
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Drops the instance. Returns whether the handle was live.
    pub fn release(&mut self, handle: Handle) -> bool {
        self.entries.remove(&handle.value()).is_some()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_monotonic_from_one() {
        let mut table = HandleTable::new();
        let a = table.allocate("a");
        let b = table.allocate("b");
        let c = table.allocate("c");

        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(c.value(), 3);
        assert_eq!(table.count(), 3);
    }

    #[test]
    fn test_resolve_succeeds_iff_live() {
        let mut table = HandleTable::new();
        let handle = table.allocate(42);

        assert_eq!(table.resolve(handle).unwrap(), &42);
        assert!(table.release(handle));
        assert_eq!(table.resolve(handle), Err(Error::InvalidHandle(handle)));
        assert_eq!(table.count(), 0);
    }

    #[test]
    fn test_release_is_idempotent_and_reports_liveness() {
        let mut table = HandleTable::new();
        let handle = table.allocate(());

        assert!(table.release(handle));
        assert!(!table.release(handle));
    }

    #[test]
    fn test_released_handles_are_never_recycled() {
        let mut table = HandleTable::new();
        let first = table.allocate("first");
        table.release(first);

        let second = table.allocate("second");
        assert_ne!(first, second);
        assert!(table.resolve(first).is_err());
        assert_eq!(table.resolve(second).unwrap(), &"second");
    }

    #[test]
    fn test_fabricated_handle_is_invalid() {
        let table: HandleTable<u8> = HandleTable::new();
        let bogus = Handle::from(7);
        assert_eq!(table.resolve(bogus), Err(Error::InvalidHandle(bogus)));
    }
}
