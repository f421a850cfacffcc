//! Projection of workflow state onto the single display mode the UI shows.

use crate::core::conversation::Conversation;
use crate::core::media::MediaAsset;
use crate::core::message::Turn;
use crate::core::stage::StageController;

/// Which conversation actions are currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionAvailability {
    pub seed: bool,
    pub image: bool,
    pub retry: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum AudioView<'a> {
    /// Not generated yet; the request action is available.
    Absent,
    Pending,
    Ready(&'a MediaAsset),
}

impl AudioView<'_> {
    pub fn can_request(&self) -> bool {
        matches!(self, AudioView::Absent)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DisplayMode<'a> {
    ImageLoading,
    ImageResult {
        image: &'a MediaAsset,
        assistant_text: &'a str,
        audio: AudioView<'a>,
    },
    Conversation {
        turns: &'a [Turn],
        busy_text: bool,
        actions: ActionAvailability,
    },
}

impl DisplayMode<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::ImageLoading => "image-loading",
            DisplayMode::ImageResult { .. } => "image-result",
            DisplayMode::Conversation { .. } => "conversation",
        }
    }
}

/// Derive the display mode. Pure: same state, same mode.
pub fn project<'a>(conversation: &'a Conversation, stage: &'a StageController) -> DisplayMode<'a> {
    if stage.is_busy_image() {
        return DisplayMode::ImageLoading;
    }

    if let Some(image) = stage.image() {
        let audio = match stage.audio() {
            Some(asset) => AudioView::Ready(asset),
            None if stage.is_busy_audio() => AudioView::Pending,
            None => AudioView::Absent,
        };
        return DisplayMode::ImageResult {
            image,
            assistant_text: conversation.last_assistant_text().unwrap_or_default(),
            audio,
        };
    }

    DisplayMode::Conversation {
        turns: conversation.turns(),
        busy_text: conversation.is_busy(),
        actions: ActionAvailability {
            seed: stage.can_request_seed(conversation),
            image: stage.can_request_image(conversation),
            retry: stage.can_retry(conversation),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::MediaPayload;

    fn asset(bytes: &[u8], mime: &str) -> MediaAsset {
        MediaAsset::new(MediaPayload::new(bytes.to_vec(), mime), None)
    }

    fn recipe_state() -> (Conversation, StageController) {
        let mut conversation = Conversation::new();
        let mut stage = StageController::new();
        let request = stage.request_seed(&mut conversation, "recipe").unwrap();
        conversation.apply_fragment(request.stream_id, "Recipe: mix flour.");
        conversation.complete_stream(request.stream_id);
        (conversation, stage)
    }

    #[test]
    fn empty_state_is_conversation_with_seed_only() {
        let conversation = Conversation::new();
        let stage = StageController::new();
        match project(&conversation, &stage) {
            DisplayMode::Conversation {
                turns,
                busy_text,
                actions,
            } => {
                assert!(turns.is_empty());
                assert!(!busy_text);
                assert_eq!(
                    actions,
                    ActionAvailability {
                        seed: true,
                        image: false,
                        retry: false
                    }
                );
            }
            other => panic!("unexpected mode {}", other.name()),
        }
    }

    #[test]
    fn streaming_disables_every_action() {
        let mut conversation = Conversation::new();
        let mut stage = StageController::new();
        let request = stage.request_seed(&mut conversation, "recipe").unwrap();
        conversation.apply_fragment(request.stream_id, "Rec");

        match project(&conversation, &stage) {
            DisplayMode::Conversation {
                busy_text, actions, ..
            } => {
                assert!(busy_text);
                assert_eq!(actions, ActionAvailability::default());
            }
            other => panic!("unexpected mode {}", other.name()),
        }
    }

    #[test]
    fn pending_image_shows_loading() {
        let (conversation, mut stage) = recipe_state();
        stage.request_image(&conversation).unwrap();
        assert!(matches!(
            project(&conversation, &stage),
            DisplayMode::ImageLoading
        ));
    }

    #[test]
    fn image_result_carries_text_and_audio_substate() {
        let (conversation, mut stage) = recipe_state();
        stage.request_image(&conversation).unwrap();
        stage.image_succeeded(asset(b"P1", "image/jpeg"));

        match project(&conversation, &stage) {
            DisplayMode::ImageResult {
                image,
                assistant_text,
                audio,
            } => {
                assert_eq!(image.payload().bytes(), b"P1");
                assert_eq!(assistant_text, "Recipe: mix flour.");
                assert!(audio.can_request());
            }
            other => panic!("unexpected mode {}", other.name()),
        }

        stage.request_audio(&conversation).unwrap();
        assert!(matches!(
            project(&conversation, &stage),
            DisplayMode::ImageResult {
                audio: AudioView::Pending,
                ..
            }
        ));

        stage.audio_succeeded(asset(b"P2", "audio/mpeg"));
        match project(&conversation, &stage) {
            DisplayMode::ImageResult {
                audio: AudioView::Ready(audio),
                ..
            } => assert_eq!(audio.payload().bytes(), b"P2"),
            other => panic!("unexpected mode {}", other.name()),
        }
    }

    #[test]
    fn failed_image_returns_to_conversation_with_image_enabled() {
        let (conversation, mut stage) = recipe_state();
        stage.request_image(&conversation).unwrap();
        stage.image_failed(&crate::utils::test_utils::gateway_error(500));

        match project(&conversation, &stage) {
            DisplayMode::Conversation { actions, .. } => assert!(actions.image),
            other => panic!("unexpected mode {}", other.name()),
        }
    }
}
