//! Audit trail port
//!
//! Domain services report state changes as `AuditEvent`s. Delivery is
//! fire-and-forget: a failing sink is logged and never fails the operation
//! that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{AuditEventId, UserId};
use crate::ports::{DomainPort, PortError};

/// One recorded action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: UserId,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
    ) -> Self {
        Self {
            id: AuditEventId::new_v7(),
            actor,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            before: None,
            after: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_before(mut self, value: serde_json::Value) -> Self {
        self.before = Some(value);
        self
    }

    pub fn with_after(mut self, value: serde_json::Value) -> Self {
        self.after = Some(value);
        self
    }
}

/// Destination for audit events
#[async_trait]
pub trait AuditSink: DomainPort {
    async fn record(&self, event: AuditEvent) -> Result<(), PortError>;
}

/// Records an event, logging instead of propagating a sink failure
pub async fn record_quietly(sink: &dyn AuditSink, event: AuditEvent) {
    let action = event.action.clone();
    let entity_id = event.entity_id.clone();
    if let Err(e) = sink.record(event).await {
        tracing::warn!(
            action = %action,
            entity_id = %entity_id,
            error = %e,
            "audit sink rejected event"
        );
    }
}

/// Sink that keeps events in memory
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default, Clone)]
    pub struct MemoryAuditSink {
        events: Arc<RwLock<Vec<AuditEvent>>>,
        failing: bool,
    }

    impl MemoryAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink whose every write fails
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub async fn events(&self) -> Vec<AuditEvent> {
            self.events.read().await.clone()
        }

        pub async fn actions(&self) -> Vec<String> {
            self.events.read().await.iter().map(|e| e.action.clone()).collect()
        }
    }

    impl DomainPort for MemoryAuditSink {}

    #[async_trait]
    impl AuditSink for MemoryAuditSink {
        async fn record(&self, event: AuditEvent) -> Result<(), PortError> {
            if self.failing {
                return Err(PortError::connection("audit store unavailable"));
            }
            self.events.write().await.push(event);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MemoryAuditSink;
    use super::*;

    #[tokio::test]
    async fn test_failing_sink_is_swallowed() {
        let sink = MemoryAuditSink::failing();
        record_quietly(&sink, AuditEvent::new(UserId::system(), "X", "claim", "1")).await;
        assert!(sink.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_are_kept() {
        let sink = MemoryAuditSink::new();
        let event = AuditEvent::new(UserId::new(), "APPROVAL_STARTED", "claim_approval", "a-1")
            .with_after(serde_json::json!({"step": 1}));
        record_quietly(&sink, event).await;
        assert_eq!(sink.actions().await, vec!["APPROVAL_STARTED".to_string()]);
    }
}
