//! Backing stores for the context registry.
//!
//! The registry owns its storage through the small [`ContextStore`]
//! capability trait. Three implementations ship with the crate:
//!
//! - a plain `HashMap` - the default, unbounded
//! - [`BoundedStore`] - fixed capacity, evicts the oldest-inserted entry
//! - [`TimedStore`] - every entry expires after a uniform TTL
//!
//! The containers themselves are generic and usable on their own; the trait
//! is implemented for their `OperationId -> CorrelationContext`
//! instantiation, which is the shape the registry requires.

use std::collections::HashMap;

use strand_types::{CorrelationContext, OperationId};

mod bounded;
mod timed;

pub use bounded::BoundedStore;
pub use timed::TimedStore;

/// Associative storage for registry entries.
///
/// `get` hands out an owned deep copy and `insert` stores the value it is
/// given; the registry clones at every boundary, so implementations never
/// share live references with callers.
pub trait ContextStore: Send {
    fn get(&self, operation: OperationId) -> Option<CorrelationContext>;

    fn insert(&mut self, operation: OperationId, context: CorrelationContext);

    fn contains(&self, operation: OperationId) -> bool;

    /// Remove an entry, reporting whether one existed.
    fn remove(&mut self, operation: OperationId) -> bool;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContextStore for HashMap<OperationId, CorrelationContext> {
    fn get(&self, operation: OperationId) -> Option<CorrelationContext> {
        HashMap::get(self, &operation).cloned()
    }

    fn insert(&mut self, operation: OperationId, context: CorrelationContext) {
        HashMap::insert(self, operation, context);
    }

    fn contains(&self, operation: OperationId) -> bool {
        self.contains_key(&operation)
    }

    fn remove(&mut self, operation: OperationId) -> bool {
        HashMap::remove(self, &operation).is_some()
    }

    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

impl ContextStore for BoundedStore<OperationId, CorrelationContext> {
    fn get(&self, operation: OperationId) -> Option<CorrelationContext> {
        BoundedStore::get(self, &operation).cloned()
    }

    fn insert(&mut self, operation: OperationId, context: CorrelationContext) {
        BoundedStore::insert(self, operation, context);
    }

    fn contains(&self, operation: OperationId) -> bool {
        self.contains_key(&operation)
    }

    fn remove(&mut self, operation: OperationId) -> bool {
        BoundedStore::remove(self, &operation).is_some()
    }

    fn clear(&mut self) {
        BoundedStore::clear(self);
    }

    fn len(&self) -> usize {
        BoundedStore::len(self)
    }
}

impl ContextStore for TimedStore<OperationId, CorrelationContext> {
    fn get(&self, operation: OperationId) -> Option<CorrelationContext> {
        TimedStore::get(self, &operation)
    }

    fn insert(&mut self, operation: OperationId, context: CorrelationContext) {
        TimedStore::insert(self, operation, context);
    }

    fn contains(&self, operation: OperationId) -> bool {
        self.contains_key(&operation)
    }

    fn remove(&mut self, operation: OperationId) -> bool {
        TimedStore::remove(self, &operation).is_some()
    }

    fn clear(&mut self) {
        TimedStore::clear(self);
    }

    fn len(&self) -> usize {
        TimedStore::len(self)
    }
}
