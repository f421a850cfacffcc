mod generation;
mod input;
mod streaming;

use std::path::PathBuf;

use tokio::sync::mpsc;

use super::App;
use crate::core::chat_stream::StreamParams;
use crate::core::gateway::GatewayError;
use crate::core::media::{MediaAsset, MediaKind};

#[derive(Debug)]
pub enum AppAction {
    /// Send the seed prompt as the first turn.
    RequestSeed,
    /// Re-open the stream for an unanswered seed.
    RetrySeed,
    RequestImage,
    RequestAudio,
    AppendResponseChunk {
        content: String,
        stream_id: u64,
    },
    StreamErrored {
        message: String,
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
    MediaGenerated {
        kind: MediaKind,
        result: Result<MediaAsset, GatewayError>,
    },
    OpenMedia {
        kind: MediaKind,
    },
    SetStatus {
        message: String,
    },
    ClearStatus,
    ScrollUp {
        lines: u16,
    },
    ScrollDown {
        lines: u16,
    },
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

#[derive(Debug)]
pub struct AppActionEnvelope {
    pub action: AppAction,
    pub context: AppActionContext,
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppActionEnvelope>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppActionEnvelope>) -> Self {
        Self { tx }
    }

    pub fn dispatch_many<I>(&self, actions: I, ctx: AppActionContext)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(AppActionEnvelope {
                action,
                context: ctx,
            });
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        self.dispatch_many([action], AppActionContext::default());
    }
}

/// Side effects requested by an action, executed outside the state lock.
#[derive(Debug)]
pub enum AppCommand {
    SpawnStream(StreamParams),
    GenerateMedia { kind: MediaKind, text: String },
    OpenMedia { command: String, path: PathBuf },
}

pub fn apply_actions(
    app: &mut App,
    envelopes: impl IntoIterator<Item = AppActionEnvelope>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for envelope in envelopes {
        if let Some(cmd) = apply_action(app, envelope.action, envelope.context) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::RequestSeed
        | AppAction::RetrySeed
        | AppAction::AppendResponseChunk { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamCompleted { .. } => streaming::handle_streaming_action(app, action, ctx),

        AppAction::RequestImage
        | AppAction::RequestAudio
        | AppAction::MediaGenerated { .. }
        | AppAction::OpenMedia { .. } => generation::handle_generation_action(app, action, ctx),

        AppAction::SetStatus { .. }
        | AppAction::ClearStatus
        | AppAction::ScrollUp { .. }
        | AppAction::ScrollDown { .. }
        | AppAction::Quit => input::handle_input_action(app, action, ctx),
    }
}
