//! The correlation context value type and its update rules.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Metadata bag attached to a correlation context.
///
/// Plain JSON data by construction: cloning the map is a full deep copy, so
/// contexts handed out by accessors can never alias stored state.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The context carried across one chain of logically related operations.
///
/// Serializes with the conventional wire field names (`correlationId`,
/// `startTime`, `metadata`) so log formatters and header glue can pass it
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationContext {
    /// Non-empty identifier shared by every operation in the chain.
    pub correlation_id: String,
    /// Epoch milliseconds at context creation. Set once; updates preserve it.
    pub start_time: i64,
    /// Caller-owned metadata, replaced wholesale by updates that carry one.
    pub metadata: Metadata,
}

impl CorrelationContext {
    /// Create a context starting now, with empty metadata.
    #[must_use]
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            start_time: Utc::now().timestamp_millis(),
            metadata: Metadata::new(),
        }
    }

    /// Merge a partial update into this context.
    ///
    /// `metadata` is replaced (not recursively merged) when the update
    /// carries one. The correlation ID is overwritten only by a non-empty
    /// value. `start_time` is never touched.
    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(correlation_id) = update.correlation_id
            && !correlation_id.is_empty()
        {
            self.correlation_id = correlation_id;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
    }

    /// Milliseconds elapsed since the chain started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now().timestamp_millis() - self.start_time
    }
}

/// Partial update accepted by `set_context`.
///
/// Fields left as `None` keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct ContextUpdate {
    pub correlation_id: Option<String>,
    pub metadata: Option<Metadata>,
}

impl ContextUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
