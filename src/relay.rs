//! Per-update glue: identity, classification, planning, sending, audit.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::audit::{AuditRecord, AuditSink};
use crate::event::{self, ChatIdentity};
use crate::orchestrator::{Orchestrator, OutboundAction, Plan};
use crate::platform::ChatPlatform;

/// Outcome reported to the webhook caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Update had a message and was processed.
    Ok,
    /// No `message` object in the update.
    Rejected,
}

pub struct Relay {
    platform: Arc<dyn ChatPlatform>,
    orchestrator: Orchestrator,
    audit: Arc<dyn AuditSink>,
}

impl Relay {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        orchestrator: Orchestrator,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            platform,
            orchestrator,
            audit,
        }
    }

    pub fn platform(&self) -> &dyn ChatPlatform {
        self.platform.as_ref()
    }

    /// Process one webhook update. Never fails once a message is present:
    /// send and storage errors are logged and swallowed.
    pub async fn handle(&self, update: &Value) -> Ack {
        let Some(message) = update.get("message").filter(|m| m.is_object()) else {
            warn!("Update without a message object, rejecting");
            return Ack::Rejected;
        };

        let span = info_span!(
            "webhook",
            request_id = %Uuid::new_v4(),
            chat_id = field::Empty,
            kind = field::Empty,
        );
        self.process(message).instrument(span).await;
        Ack::Ok
    }

    async fn process(&self, message: &Value) {
        let identity = ChatIdentity::from_message(message);
        let event = event::classify(message);
        let span = Span::current();
        span.record("chat_id", identity.chat_id);
        span.record("kind", event.kind().as_str());
        info!("Received {} message", event.kind());

        let Plan { actions, audit } = self.orchestrator.plan(&event, &identity, self.platform()).await;
        self.execute(identity.chat_id, actions).await;

        let record = AuditRecord::new(&identity, audit);
        match self.audit.append(&record).await {
            Ok(()) => debug!("Audit record written"),
            Err(e) => error!("Failed to write audit record: {:#}", e),
        }
    }

    /// Run actions in order; a failed send does not stop the rest.
    async fn execute(&self, chat_id: i64, actions: Vec<OutboundAction>) {
        for action in actions {
            let result = match action {
                OutboundAction::SendText { text } => self.platform.send_text(chat_id, &text).await,
                OutboundAction::SendVoice { audio } => self.platform.send_voice(chat_id, audio).await,
                OutboundAction::Noop => continue,
            };
            if let Err(e) = result {
                warn!("Send to chat {} failed: {:#}", chat_id, e);
            }
        }
    }
}
