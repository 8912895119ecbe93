//! The event catalog (§4.1). Every event is timestamped at publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affect::Pad;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MessageReceived,
    ResponseGenerated,
    AutonomousMessageSent,
    ProactiveImpulse,
    EmotionalStateChanged,
    SystemResourceAlert,
    CryostasisActivated,
    CryostasisDeactivated,
    UserActivityChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceived {
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseGenerated {
    pub content: String,
    pub context_used: Vec<String>,
    pub generation_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousMessageSent {
    pub content: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveImpulse {
    pub trigger_reason: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalStateChanged {
    pub old_pad: Pad,
    pub new_pad: Pad,
    pub trigger: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemResourceAlert {
    pub resource: String,
    pub value: f32,
    pub threshold: f32,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryostasisActivated {
    pub reason: String,
    pub freed_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryostasisDeactivated {
    pub load_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Idle,
    Gaming,
    Coding,
    Streaming,
    Browsing,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivityChanged {
    pub old: ActivityKind,
    pub new: ActivityKind,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    MessageReceived(MessageReceived),
    ResponseGenerated(ResponseGenerated),
    AutonomousMessageSent(AutonomousMessageSent),
    ProactiveImpulse(ProactiveImpulse),
    EmotionalStateChanged(EmotionalStateChanged),
    SystemResourceAlert(SystemResourceAlert),
    CryostasisActivated(CryostasisActivated),
    CryostasisDeactivated(CryostasisDeactivated),
    UserActivityChanged(UserActivityChanged),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::MessageReceived(_) => EventKind::MessageReceived,
            EventPayload::ResponseGenerated(_) => EventKind::ResponseGenerated,
            EventPayload::AutonomousMessageSent(_) => EventKind::AutonomousMessageSent,
            EventPayload::ProactiveImpulse(_) => EventKind::ProactiveImpulse,
            EventPayload::EmotionalStateChanged(_) => EventKind::EmotionalStateChanged,
            EventPayload::SystemResourceAlert(_) => EventKind::SystemResourceAlert,
            EventPayload::CryostasisActivated(_) => EventKind::CryostasisActivated,
            EventPayload::CryostasisDeactivated(_) => EventKind::CryostasisDeactivated,
            EventPayload::UserActivityChanged(_) => EventKind::UserActivityChanged,
        }
    }
}

/// A published event: the typed payload plus the publish timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub payload: EventPayload,
    pub published_at: DateTime<Utc>,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            published_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}
