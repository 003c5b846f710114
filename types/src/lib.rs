//! Core domain types for Strand.
//!
//! This crate contains pure domain types with no IO and no async: the opaque
//! operation identity, the correlation context value type, the typed partial
//! update applied by `set_context`, and the library error taxonomy.
//! Everything here can be used from any layer of an application.

mod context;
mod error;
mod ids;

pub use context::{ContextUpdate, CorrelationContext, Metadata};
pub use error::{BoxError, ContextError};
pub use ids::OperationId;
