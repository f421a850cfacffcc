//! Application state shared by the interactive and headless front ends.
//!
//! [`App`] bundles the conversation, the stage controller and presentation
//! state. It is only mutated by [`apply_actions`]; network work is described
//! by the returned [`AppCommand`]s and performed elsewhere.

use crate::core::chat_stream::StreamParams;
use crate::core::conversation::{Conversation, StreamRequest};
use crate::core::stage::StageController;
use crate::core::view::{project, DisplayMode};

pub mod actions;
pub mod executor;
pub mod session;
pub mod ui_state;


pub use actions::{
    apply_action, apply_actions, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, AppCommand,
};
pub use executor::{stream_message_action, CommandExecutor};
pub use session::{SessionContext, SessionOverrides};
pub use ui_state::UiState;

pub struct App {
    pub session: SessionContext,
    pub conversation: Conversation,
    pub stage: StageController,
    pub ui: UiState,
}

impl App {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            conversation: Conversation::new(),
            stage: StageController::new(),
            ui: UiState::new(),
        }
    }

    pub fn display_mode(&self) -> DisplayMode<'_> {
        project(&self.conversation, &self.stage)
    }

    /// Any network operation in flight.
    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy() || self.stage.is_busy_image() || self.stage.is_busy_audio()
    }

    pub fn stream_params(&self, request: StreamRequest) -> StreamParams {
        StreamParams {
            client: self.session.client.clone(),
            url: self.session.chat_url.clone(),
            api_key: self.session.api_key.clone(),
            model: self.session.model.clone(),
            protocol: self.session.protocol,
            api_messages: request.api_messages,
            cancel_token: request.cancel_token,
            stream_id: request.stream_id,
        }
    }

    /// Cancel in-flight work and mark the session finished.
    pub fn shutdown(&mut self) {
        self.conversation.shutdown();
        self.ui.exit_requested = true;
    }
}
