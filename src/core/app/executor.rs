//! Runs [`AppCommand`]s as background tasks.
//!
//! Every task reports back by dispatching an [`AppAction`]; nothing here
//! touches `App` directly.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{AppAction, AppActionDispatcher, AppCommand};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::gateway::{GatewayError, MediaGateway};
use crate::core::media::{MediaAsset, MediaKind};

/// Translate one stream event into the action that applies it.
pub fn stream_message_action(message: StreamMessage, stream_id: u64) -> AppAction {
    match message {
        StreamMessage::Chunk(content) => AppAction::AppendResponseChunk { content, stream_id },
        StreamMessage::Error(message) => AppAction::StreamErrored { message, stream_id },
        StreamMessage::End => AppAction::StreamCompleted { stream_id },
    }
}

#[derive(Clone)]
pub struct CommandExecutor {
    stream_service: Arc<ChatStreamService>,
    gateway: Arc<dyn MediaGateway>,
    dispatcher: AppActionDispatcher,
}

impl CommandExecutor {
    pub fn new(
        stream_service: Arc<ChatStreamService>,
        gateway: Arc<dyn MediaGateway>,
        dispatcher: AppActionDispatcher,
    ) -> Self {
        Self {
            stream_service,
            gateway,
            dispatcher,
        }
    }

    pub fn execute_all(&self, commands: impl IntoIterator<Item = AppCommand>) {
        for command in commands {
            self.execute(command);
        }
    }

    pub fn execute(&self, command: AppCommand) {
        match command {
            AppCommand::SpawnStream(params) => {
                debug!(stream_id = params.stream_id, "spawning recipe stream");
                self.stream_service.spawn_stream(params);
            }
            AppCommand::GenerateMedia { kind, text } => {
                spawn_media_generation(self.gateway.clone(), self.dispatcher.clone(), kind, text);
            }
            AppCommand::OpenMedia { command, path } => {
                spawn_media_opener(self.dispatcher.clone(), command, path);
            }
        }
    }
}

fn spawn_media_generation(
    gateway: Arc<dyn MediaGateway>,
    dispatcher: AppActionDispatcher,
    kind: MediaKind,
    text: String,
) {
    tokio::spawn(async move {
        let result = match gateway.generate(kind, &text).await {
            Ok(payload) => {
                tokio::task::spawn_blocking(move || MediaAsset::from_payload(payload))
                    .await
                    .map_err(|e| {
                        warn!(kind = kind.label(), "media write task failed: {e}");
                        GatewayError::Decode(format!("could not store {}: {e}", kind.label()))
                    })
            }
            Err(err) => Err(err),
        };
        dispatcher.dispatch(AppAction::MediaGenerated { kind, result });
    });
}

fn spawn_media_opener(dispatcher: AppActionDispatcher, command: String, path: PathBuf) {
    tokio::spawn(async move {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            dispatcher.dispatch(AppAction::SetStatus {
                message: "open-command is empty".to_string(),
            });
            return;
        };

        let spawned = tokio::process::Command::new(program)
            .args(parts)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                dispatcher.dispatch(AppAction::SetStatus {
                    message: format!("Opened {} with {program}", path.display()),
                });
                if let Err(e) = child.wait().await {
                    warn!("{program} did not exit cleanly: {e}");
                }
            }
            Err(e) => {
                warn!("could not launch {program}: {e}");
                dispatcher.dispatch(AppAction::SetStatus {
                    message: format!("Could not launch {program}: {e}"),
                });
            }
        }
    });
}
