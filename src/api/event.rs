//! Events emitted while a pipeline runs.

use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::PipelineError;

/// Record of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Shared by every event of the same run.
    pub invocation_id: Uuid,
    /// Name of the step that produced the content.
    pub author: String,
    /// State key the content was written to.
    pub output_key: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        invocation_id: Uuid,
        author: impl Into<String>,
        output_key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invocation_id,
            author: author.into(),
            output_key: output_key.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Lazy, single-pass sequence of events. The first error is the last item.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<Event, PipelineError>> + Send + 'a>>;
