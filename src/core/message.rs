use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    /// Label shown in front of the turn in the transcript.
    pub fn display_prefix(self) -> &'static str {
        match self {
            TurnRole::User => "User: ",
            TurnRole::Assistant => "AI: ",
        }
    }

    pub fn is_user(self) -> bool {
        self == TurnRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TurnRole::Assistant
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TurnRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            _ => Err(format!("invalid turn role: {value}")),
        }
    }
}

impl TryFrom<String> for TurnRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TurnRole> for String {
    fn from(value: TurnRole) -> Self {
        value.as_str().to_string()
    }
}

static FALLBACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier assigned to a turn when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(String);

impl TurnId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        if getrandom::fill(&mut bytes).is_err() {
            // No OS entropy; clock plus a process-wide counter is still unique per session.
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let count = FALLBACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            bytes[..8].copy_from_slice(&nanos.to_be_bytes());
            bytes[8..].copy_from_slice(&count.to_be_bytes());
        }
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message in the conversation.
///
/// `id` and `role` never change after creation. `content` only grows, and only
/// through the conversation that owns the turn.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    id: TurnId,
    role: TurnRole,
    content: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::generate(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &TurnId {
        &self.id
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub(crate) fn push_content(&mut self, fragment: &str) {
        self.content.push_str(fragment);
    }

    pub fn to_api_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}
