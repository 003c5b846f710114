use thiserror::Error;

/// Boxed error type accepted from caller-supplied correlation ID generators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the context accessors.
///
/// All of these surface synchronously to the immediate caller; nothing is
/// retried or reported in the background.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No operation identity is bound to the running code. Accessors must be
    /// called inside a tracked scope, before registry teardown.
    #[error("operation tracking is unavailable; run inside a tracked scope")]
    TrackingUnavailable,

    /// A caller-supplied correlation ID generator failed. The underlying
    /// error is passed through verbatim.
    #[error("correlation id generator failed")]
    IdGenerator(#[source] BoxError),

    /// A correlation ID was empty, either from a generator or a caller.
    #[error("correlation id must be a non-empty string")]
    EmptyCorrelationId,
}
