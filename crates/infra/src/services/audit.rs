//! Audit trail recording.

use std::sync::Arc;

use chrono::Utc;

use tillworks_core::{DomainResult, UserId};

use crate::repo::{AuditEntry, AuditSink};

/// Writes audit entries for mutating operations.
///
/// Recording is best effort: a failed write is logged and swallowed so the
/// business operation it describes still succeeds.
#[derive(Clone)]
pub struct AuditService {
    sink: Arc<dyn AuditSink>,
}

impl AuditService {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn record(
        &self,
        actor: Option<UserId>,
        action: &str,
        entity_type: &str,
        entity_id: impl ToString,
        metadata: serde_json::Value,
    ) {
        let entry = AuditEntry::new(actor, action, entity_type, entity_id, metadata, Utc::now());
        if let Err(err) = self.sink.record(entry).await {
            tracing::warn!(action, %err, "audit record dropped");
        }
    }

    pub async fn entries(&self) -> DomainResult<Vec<AuditEntry>> {
        self.sink.list().await
    }
}
