//! The process-wide registry mapping operation identities to contexts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, trace};
use uuid::Uuid;

use strand_store::ContextStore;
use strand_types::{BoxError, ContextError, ContextUpdate, CorrelationContext, OperationId};

use crate::scope;

static GLOBAL: OnceLock<Arc<ContextRegistry>> = OnceLock::new();

/// Zero-argument correlation ID generator. Failures propagate verbatim to
/// whichever accessor triggered generation.
pub type CorrelationIdFn = Box<dyn Fn() -> Result<String, BoxError> + Send + Sync>;

/// Construction options for [`ContextRegistry`].
#[derive(Default)]
pub struct RegistryOptions {
    store: Option<Box<dyn ContextStore>>,
    correlation_id_fn: Option<CorrelationIdFn>,
}

impl RegistryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied backing store instead of the default unbounded
    /// map. The bundled [`BoundedStore`](strand_store::BoundedStore) and
    /// [`TimedStore`](strand_store::TimedStore) both qualify.
    #[must_use]
    pub fn store(mut self, store: impl ContextStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Override UUID v4 generation for correlation IDs. The generator must
    /// produce a non-empty string; errors reach the accessor caller.
    #[must_use]
    pub fn correlation_id_fn<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.correlation_id_fn = Some(Box::new(generate));
        self
    }
}

/// Registry of correlation contexts keyed by operation identity.
///
/// All accessors resolve "the operation the calling code currently runs
/// under" from the ambient task-local identity, so application code never
/// handles [`OperationId`]s itself. Contexts cross the store boundary by
/// deep copy in both directions: a returned context is independent of the
/// stored one, and later mutations of either are invisible to the other.
pub struct ContextRegistry {
    store: Mutex<Box<dyn ContextStore>>,
    correlation_id_fn: Option<CorrelationIdFn>,
    active: AtomicBool,
}

impl ContextRegistry {
    /// Create an explicitly owned registry, for composition roots that pass
    /// the instance to collaborators by reference.
    #[must_use]
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            store: Mutex::new(options.store.unwrap_or_else(|| {
                Box::new(HashMap::<OperationId, CorrelationContext>::new())
            })),
            correlation_id_fn: options.correlation_id_fn,
            active: AtomicBool::new(true),
        }
    }

    /// Get the process-wide registry, creating it on first call.
    ///
    /// Construction is idempotent: later calls return the existing instance
    /// and drop their `options` unused.
    pub fn get_or_init(options: RegistryOptions) -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new(options))))
    }

    /// The process-wide registry, if one has been initialized.
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL.get().map(Arc::clone)
    }

    /// Correlation ID of the current operation, lazily adopting a fresh
    /// default context when the operation has none yet.
    pub fn get_correlation_id(&self) -> Result<String, ContextError> {
        let operation = self.resolve_current()?;
        if let Some(context) = self.lock_store().get(operation) {
            return Ok(context.correlation_id);
        }
        let context = self.default_context()?;
        let correlation_id = context.correlation_id.clone();
        self.lock_store().insert(operation, context);
        Ok(correlation_id)
    }

    /// Set the current operation's correlation ID, creating the entry when
    /// absent and otherwise preserving its start time and metadata. Returns
    /// the ID actually stored.
    pub fn set_correlation_id(
        &self,
        correlation_id: impl Into<String>,
    ) -> Result<String, ContextError> {
        let correlation_id = correlation_id.into();
        if correlation_id.is_empty() {
            return Err(ContextError::EmptyCorrelationId);
        }
        let operation = self.resolve_current()?;
        let mut store = self.lock_store();
        match store.get(operation) {
            Some(mut context) => {
                context.correlation_id = correlation_id.clone();
                store.insert(operation, context);
            }
            None => {
                store.insert(operation, CorrelationContext::new(correlation_id.clone()));
            }
        }
        Ok(correlation_id)
    }

    /// Replace the current operation's correlation ID with a freshly
    /// generated one. Returns the new ID.
    pub fn regenerate_correlation_id(&self) -> Result<String, ContextError> {
        let correlation_id = self.generate_correlation_id()?;
        self.set_correlation_id(correlation_id)
    }

    /// Deep copy of the current operation's context, lazily adopting a
    /// fresh default when absent.
    pub fn get_context(&self) -> Result<CorrelationContext, ContextError> {
        let operation = self.resolve_current()?;
        if let Some(context) = self.lock_store().get(operation) {
            return Ok(context);
        }
        let context = self.default_context()?;
        self.lock_store().insert(operation, context.clone());
        Ok(context)
    }

    /// Merge a partial update into the current operation's context.
    ///
    /// `metadata` is replaced wholesale when the update carries one, the
    /// correlation ID only by a non-empty value, and the start time is
    /// always preserved. Starts from a fresh default context when the
    /// operation has no entry yet.
    pub fn set_context(&self, update: ContextUpdate) -> Result<(), ContextError> {
        let operation = self.resolve_current()?;
        let mut context = match self.lock_store().get(operation) {
            Some(existing) => existing,
            None => self.default_context()?,
        };
        context.apply(update);
        self.lock_store().insert(operation, context);
        Ok(())
    }

    /// Delete the entry for the current operation only. Entries of other
    /// operations are untouched; a later read lazily adopts a new context.
    pub fn clear(&self) -> Result<(), ContextError> {
        let operation = self.resolve_current()?;
        self.lock_store().remove(operation);
        Ok(())
    }

    /// Produce a correlation ID: the supplied generator when configured,
    /// UUID v4 otherwise. Generator failures are passed through, never
    /// retried or defaulted; empty results are rejected.
    pub fn generate_correlation_id(&self) -> Result<String, ContextError> {
        let correlation_id = match &self.correlation_id_fn {
            Some(generate) => generate().map_err(ContextError::IdGenerator)?,
            None => Uuid::new_v4().to_string(),
        };
        if correlation_id.is_empty() {
            return Err(ContextError::EmptyCorrelationId);
        }
        Ok(correlation_id)
    }

    /// Number of live entries in the backing store.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.lock_store().len()
    }

    /// Tear the registry down: disable tracking and drop every entry.
    ///
    /// Runs at most once; later calls (including a second guard drop) are
    /// no-ops. Accessors fail with
    /// [`ContextError::TrackingUnavailable`] afterwards.
    pub fn shutdown(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        debug!("context registry shutting down, dropping all entries");
        self.lock_store().clear();
    }

    /// RAII handle that invokes [`shutdown`](Self::shutdown) on drop, for
    /// tying teardown to the lifetime of the application's composition root.
    #[must_use]
    pub fn shutdown_guard(self: &Arc<Self>) -> ShutdownGuard {
        ShutdownGuard {
            registry: Arc::clone(self),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle notifications, driven by the scope combinators (or by
    // custom runtime glue). Application code never calls these directly.
    // ------------------------------------------------------------------

    /// A new operation was forked from `parent`: copy the parent's context,
    /// as it stands at this instant, onto the new identity. Without a
    /// parent entry nothing is created; adoption stays lazy.
    pub fn operation_created(&self, operation: OperationId, parent: OperationId) {
        if !self.is_active() {
            return;
        }
        let mut store = self.lock_store();
        if let Some(context) = store.get(parent) {
            trace!(%operation, %parent, "context forked to new operation");
            store.insert(operation, context);
        }
    }

    /// A deferred value finished: copy its context onto whatever operation
    /// is executing now, so the continuation observes the context of the
    /// computation rather than its own ambient one.
    pub fn value_settled(&self, value: OperationId) {
        if !self.is_active() {
            return;
        }
        let Some(current) = scope::current_operation() else {
            return;
        };
        let mut store = self.lock_store();
        if let Some(context) = store.get(value) {
            trace!(%value, %current, "context re-homed to continuation");
            store.insert(current, context);
        }
    }

    /// An operation finished or was cancelled: drop its entry.
    pub fn operation_destroyed(&self, operation: OperationId) {
        if !self.is_active() {
            return;
        }
        self.lock_store().remove(operation);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn resolve_current(&self) -> Result<OperationId, ContextError> {
        if !self.is_active() {
            return Err(ContextError::TrackingUnavailable);
        }
        scope::current_operation().ok_or(ContextError::TrackingUnavailable)
    }

    fn default_context(&self) -> Result<CorrelationContext, ContextError> {
        Ok(CorrelationContext::new(self.generate_correlation_id()?))
    }

    fn lock_store(&self) -> MutexGuard<'_, Box<dyn ContextStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Invokes [`ContextRegistry::shutdown`] when dropped.
pub struct ShutdownGuard {
    registry: Arc<ContextRegistry>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.registry.shutdown();
    }
}
