//! The stage controller: an explicit state machine over the generation
//! workflow.
//!
//! ```text
//!   chat ──request image──▶ image-pending ──ok──▶ image-ready ──request audio──▶ audio-pending
//!    ▲                           │                    ▲                              │
//!    └────────── error ──────────┘                    ├────────── error ─────────────┤
//!                                                     │                              ok
//!                                               audio-ready ◀────────────────────────┘
//! ```
//!
//! Stages only move forward; once an image exists there is no way back to
//! `chat`. The controller is the only writer of the image/audio payloads and
//! the busy flags derived from the stage.

use std::fmt;

use tracing::{info, warn};

use crate::core::conversation::{Conversation, ConversationError, StreamRequest};
use crate::core::gateway::GatewayError;
use crate::core::media::{MediaAsset, MediaKind};
use crate::core::message::TurnRole;

/// Turn count at which the assistant's recipe reply is considered complete:
/// one seed request, one reply.
pub const RECIPE_TURN_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Chat,
    ImagePending,
    ImageReady,
    AudioPending,
    AudioReady,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Chat => "chat",
            Stage::ImagePending => "image-pending",
            Stage::ImageReady => "image-ready",
            Stage::AudioPending => "audio-pending",
            Stage::AudioReady => "audio-ready",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    Seed,
    Retry,
    RequestImage,
    RequestAudio,
}

impl StageAction {
    pub fn label(self) -> &'static str {
        match self {
            StageAction::Seed => "request a recipe",
            StageAction::Retry => "retry the recipe",
            StageAction::RequestImage => "generate an image",
            StageAction::RequestAudio => "generate audio",
        }
    }
}

/// A rejected action. State is never modified when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    WrongStage { action: StageAction, stage: Stage },
    TextBusy { action: StageAction },
    LogNotEmpty { turns: usize },
    LogLength { expected: usize, actual: usize },
    NoAssistantReply,
    AudioPresent,
    Conversation(ConversationError),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::WrongStage { action, stage } => {
                write!(f, "Cannot {} while in the {stage} stage", action.label())
            }
            StageError::TextBusy { action } => {
                write!(f, "Cannot {} while a reply is streaming", action.label())
            }
            StageError::LogNotEmpty { turns } => {
                write!(f, "A recipe was already requested ({turns} turns in the log)")
            }
            StageError::LogLength { expected, actual } => write!(
                f,
                "Image generation needs exactly {expected} turns, the log has {actual}"
            ),
            StageError::NoAssistantReply => write!(f, "There is no assistant reply to use"),
            StageError::AudioPresent => write!(f, "Audio has already been generated"),
            StageError::Conversation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StageError {}

impl From<ConversationError> for StageError {
    fn from(value: ConversationError) -> Self {
        StageError::Conversation(value)
    }
}

#[derive(Debug, Default)]
pub struct StageController {
    stage: Stage,
    image: Option<MediaAsset>,
    audio: Option<MediaAsset>,
    last_error: Option<String>,
}

impl StageController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_busy_image(&self) -> bool {
        self.stage == Stage::ImagePending
    }

    pub fn is_busy_audio(&self) -> bool {
        self.stage == Stage::AudioPending
    }

    pub fn image(&self) -> Option<&MediaAsset> {
        self.image.as_ref()
    }

    pub fn audio(&self) -> Option<&MediaAsset> {
        self.audio.as_ref()
    }

    pub fn asset(&self, kind: MediaKind) -> Option<&MediaAsset> {
        match kind {
            MediaKind::Image => self.image(),
            MediaKind::Audio => self.audio(),
        }
    }

    /// Most recent gateway failure, kept until the next request.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_request_seed(&self, conversation: &Conversation) -> bool {
        self.stage == Stage::Chat && conversation.is_empty() && !conversation.is_busy()
    }

    pub fn can_retry(&self, conversation: &Conversation) -> bool {
        self.stage == Stage::Chat && conversation.can_retry()
    }

    pub fn can_request_image(&self, conversation: &Conversation) -> bool {
        self.stage == Stage::Chat
            && conversation.len() == RECIPE_TURN_COUNT
            && !conversation.is_busy()
    }

    pub fn can_request_audio(&self) -> bool {
        self.stage == Stage::ImageReady && self.audio.is_none()
    }

    fn ensure_chat(&self, action: StageAction) -> Result<(), StageError> {
        if self.stage != Stage::Chat {
            return Err(StageError::WrongStage {
                action,
                stage: self.stage,
            });
        }
        Ok(())
    }

    /// chat → chat (busyText): append the seed prompt and open the exchange.
    pub fn request_seed(
        &mut self,
        conversation: &mut Conversation,
        prompt: &str,
    ) -> Result<StreamRequest, StageError> {
        self.ensure_chat(StageAction::Seed)?;
        if conversation.is_busy() {
            return Err(StageError::TextBusy {
                action: StageAction::Seed,
            });
        }
        if !conversation.is_empty() {
            return Err(StageError::LogNotEmpty {
                turns: conversation.len(),
            });
        }

        let request = conversation
            .append(TurnRole::User, prompt)?
            .ok_or(StageError::Conversation(ConversationError::NothingToRetry))?;
        self.last_error = None;
        info!(stream_id = request.stream_id, "seed requested");
        Ok(request)
    }

    /// Re-open the exchange after a failed stream left the seed unanswered.
    pub fn request_retry(
        &mut self,
        conversation: &mut Conversation,
    ) -> Result<StreamRequest, StageError> {
        self.ensure_chat(StageAction::Retry)?;
        let request = conversation.retry()?;
        self.last_error = None;
        info!(stream_id = request.stream_id, "seed retried");
        Ok(request)
    }

    /// chat → image-pending. Returns the assistant text to send to the gateway.
    pub fn request_image(&mut self, conversation: &Conversation) -> Result<String, StageError> {
        self.ensure_chat(StageAction::RequestImage)?;
        if conversation.is_busy() {
            return Err(StageError::TextBusy {
                action: StageAction::RequestImage,
            });
        }
        if conversation.len() != RECIPE_TURN_COUNT {
            return Err(StageError::LogLength {
                expected: RECIPE_TURN_COUNT,
                actual: conversation.len(),
            });
        }
        let text = conversation
            .last_assistant_text()
            .ok_or(StageError::NoAssistantReply)?
            .to_string();

        self.stage = Stage::ImagePending;
        self.last_error = None;
        info!(stage = %self.stage, chars = text.len(), "image requested");
        Ok(text)
    }

    /// image-pending → image-ready.
    pub fn image_succeeded(&mut self, asset: MediaAsset) -> bool {
        if self.stage != Stage::ImagePending {
            warn!(stage = %self.stage, "ignoring image result outside image-pending");
            return false;
        }
        info!(bytes = asset.payload().len(), mime = asset.payload().mime(), "image ready");
        self.image = Some(asset);
        self.stage = Stage::ImageReady;
        true
    }

    /// image-pending → chat, with the error kept for display.
    pub fn image_failed(&mut self, error: &GatewayError) -> bool {
        if self.stage != Stage::ImagePending {
            warn!(stage = %self.stage, "ignoring image failure outside image-pending");
            return false;
        }
        warn!("image generation failed: {error}");
        self.stage = Stage::Chat;
        self.last_error = Some(format!("Image generation failed: {error}"));
        true
    }

    /// image-ready → audio-pending. Returns the assistant text to narrate.
    pub fn request_audio(&mut self, conversation: &Conversation) -> Result<String, StageError> {
        if self.stage != Stage::ImageReady {
            return Err(match self.stage {
                Stage::AudioReady => StageError::AudioPresent,
                stage => StageError::WrongStage {
                    action: StageAction::RequestAudio,
                    stage,
                },
            });
        }
        if self.audio.is_some() {
            return Err(StageError::AudioPresent);
        }
        let text = conversation
            .last_assistant_text()
            .ok_or(StageError::NoAssistantReply)?
            .to_string();

        self.stage = Stage::AudioPending;
        self.last_error = None;
        info!(stage = %self.stage, chars = text.len(), "audio requested");
        Ok(text)
    }

    /// audio-pending → audio-ready.
    pub fn audio_succeeded(&mut self, asset: MediaAsset) -> bool {
        if self.stage != Stage::AudioPending {
            warn!(stage = %self.stage, "ignoring audio result outside audio-pending");
            return false;
        }
        info!(bytes = asset.payload().len(), mime = asset.payload().mime(), "audio ready");
        self.audio = Some(asset);
        self.stage = Stage::AudioReady;
        true
    }

    /// audio-pending → image-ready, with the error kept for display.
    pub fn audio_failed(&mut self, error: &GatewayError) -> bool {
        if self.stage != Stage::AudioPending {
            warn!(stage = %self.stage, "ignoring audio failure outside audio-pending");
            return false;
        }
        warn!("audio generation failed: {error}");
        self.stage = Stage::ImageReady;
        self.last_error = Some(format!("Audio generation failed: {error}"));
        true
    }
}
