//! The ambient operation identity and the instrumented fork points.
//!
//! A task-local slot carries the [`OperationId`] of the code currently
//! running; within one task it flows across `.await` points untouched.
//! Crossing a task boundary loses the slot, which is exactly where the
//! combinators below come in: they are the explicit call sites at which
//! operations are created, handed off, and completed, and they drive the
//! registry's lifecycle notifications.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;

use strand_types::OperationId;

use crate::registry::ContextRegistry;

tokio::task_local! {
    static CURRENT_OPERATION: OperationId;
}

static NEXT_OPERATION: AtomicU64 = AtomicU64::new(1);

/// Identity of the operation the calling code runs under, if any.
///
/// `None` outside every tracked scope, e.g. on a task spawned with a bare
/// `tokio::spawn` instead of [`ContextRegistry::spawn`].
#[must_use]
pub fn current_operation() -> Option<OperationId> {
    CURRENT_OPERATION.try_with(|operation| *operation).ok()
}

fn next_operation() -> OperationId {
    OperationId::new(NEXT_OPERATION.fetch_add(1, Ordering::Relaxed))
}

/// Fires the destroyed notification when a tracked operation is dropped,
/// whether it ran to completion or was cancelled mid-flight.
struct DestroyOnDrop {
    registry: Arc<ContextRegistry>,
    operation: OperationId,
}

impl Drop for DestroyOnDrop {
    fn drop(&mut self) {
        self.registry.operation_destroyed(self.operation);
    }
}

impl ContextRegistry {
    /// Run `future` as a tracked operation.
    ///
    /// A fresh identity is allocated and, when the caller itself runs under
    /// a tracked operation, that parent's context is copied to the child
    /// *now*, at the fork point: later parent mutations are not visible to
    /// the child, and sibling operations never observe each other's
    /// metadata. The entry is destroyed when the returned future completes
    /// or is dropped.
    pub fn scope<F>(self: &Arc<Self>, future: F) -> impl Future<Output = F::Output> + use<F>
    where
        F: Future,
    {
        let operation = next_operation();
        if let Some(parent) = current_operation() {
            self.operation_created(operation, parent);
        }
        let destroy = DestroyOnDrop {
            registry: Arc::clone(self),
            operation,
        };
        async move {
            let _destroy = destroy;
            CURRENT_OPERATION.scope(operation, future).await
        }
    }

    /// Spawn `future` onto the runtime as a tracked child operation.
    ///
    /// The fork happens synchronously at this call site, in the caller's
    /// context, so the child's view of the parent context is fixed before
    /// the scheduler ever runs it.
    pub fn spawn<F>(self: &Arc<Self>, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(self.scope(future))
    }

    /// Run `future` as a deferred value whose context survives settlement.
    ///
    /// The computation runs under its own identity (forked from the caller,
    /// like [`scope`](Self::scope)). When the continuation observes the
    /// result, the value's context is copied onto whatever operation is
    /// executing at that point - which need not be the one that created the
    /// value - and the value's own entry is destroyed. This is what lets
    /// context written before a suspension point reach the code resumed
    /// after it.
    pub fn settle<F>(self: &Arc<Self>, future: F) -> impl Future<Output = F::Output> + use<F>
    where
        F: Future,
    {
        let value = next_operation();
        if let Some(parent) = current_operation() {
            self.operation_created(value, parent);
        }
        let registry = Arc::clone(self);
        let destroy = DestroyOnDrop {
            registry: Arc::clone(self),
            operation: value,
        };
        async move {
            let _destroy = destroy;
            let output = CURRENT_OPERATION.scope(value, future).await;
            registry.value_settled(value);
            output
        }
    }
}
