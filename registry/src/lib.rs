//! Correlation context propagation across asynchronous operations.
//!
//! This crate tracks a correlation ID and a metadata bag through a chain of
//! logically related async operations spawned from one external request, so
//! every log line or downstream call in the chain can be attributed to the
//! same logical operation without threading an identifier through every
//! function signature.
//!
//! # Architecture
//!
//! ```text
//! ContextRegistry (process-wide, get_or_init)
//! ├── store: Box<dyn ContextStore>   (unbounded map, BoundedStore, TimedStore)
//! ├── correlation_id_fn              (caller-supplied or UUID v4)
//! └── lifecycle notifications        (created / settled / destroyed)
//!
//! scope / spawn / settle (instrumented fork points)
//! └── CURRENT_OPERATION task-local   ("the identity of the code running now")
//! ```
//!
//! Application code enters a tracked scope at the boundary of each unit of
//! work and then calls only the accessors:
//!
//! ```no_run
//! use strand_registry::{ContextRegistry, RegistryOptions};
//!
//! # async fn handle_request() {}
//! # async fn demo() -> Result<(), strand_registry::ContextError> {
//! let registry = ContextRegistry::get_or_init(RegistryOptions::new());
//! registry
//!     .scope(async {
//!         // Adopt an inbound ID (e.g. from an x-correlation-id header) ...
//!         registry.set_correlation_id("9f8d7c6b-aaaa-4bbb-8ccc-123456789012")?;
//!         // ... and every operation forked below observes it.
//!         handle_request().await;
//!         Ok(())
//!     })
//!     .await
//! # }
//! ```
//!
//! Within one task the identity propagates across `.await` points on its
//! own. Crossing a task boundary is an explicit fork point: use
//! [`ContextRegistry::spawn`] (or wrap the future in
//! [`ContextRegistry::scope`]) instead of a bare `tokio::spawn`, and
//! [`ContextRegistry::settle`] for a deferred computation whose result is
//! observed by a continuation running under a different identity.

mod registry;
mod scope;

pub use registry::{ContextRegistry, CorrelationIdFn, RegistryOptions, ShutdownGuard};
pub use scope::current_operation;

// Re-export the domain types and bundled stores so callers depend on one crate.
pub use strand_store::{BoundedStore, ContextStore, TimedStore};
pub use strand_types::{
    BoxError, ContextError, ContextUpdate, CorrelationContext, Metadata, OperationId,
};
