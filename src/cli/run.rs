//! Headless pipeline: recipe, then image, then narration, written to a
//! directory without a terminal UI.
//!
//! The run goes through the same actions and stage guards as the interactive
//! client. Fragments are echoed to the writer as they arrive.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::core::app::{
    apply_action, stream_message_action, App, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, CommandExecutor, SessionContext,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::gateway::MediaGateway;
use crate::core::media::MediaKind;

pub const RECIPE_FILE: &str = "recipe.md";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub out_dir: PathBuf,
    pub image: bool,
    pub audio: bool,
}

/// Files written by a successful run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub recipe: PathBuf,
    pub image: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

#[derive(Debug)]
pub enum RunError {
    /// A pipeline step was rejected or failed; the message is what the
    /// interactive client would show on its status line.
    Step {
        step: &'static str,
        message: String,
    },
    Io(io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Step { step, message } => write!(f, "{step} failed: {message}"),
            RunError::Io(e) => write!(f, "could not write output: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Io(e) => Some(e),
            RunError::Step { .. } => None,
        }
    }
}

impl From<io::Error> for RunError {
    fn from(value: io::Error) -> Self {
        RunError::Io(value)
    }
}

fn step_failed(step: &'static str, app: &App, fallback: &str) -> RunError {
    RunError::Step {
        step,
        message: app
            .ui
            .status
            .clone()
            .unwrap_or_else(|| fallback.to_string()),
    }
}

fn media_file_name(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image",
        MediaKind::Audio => "narration",
    }
}

struct Pipeline {
    app: App,
    executor: CommandExecutor,
    stream_rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    action_rx: mpsc::UnboundedReceiver<AppActionEnvelope>,
}

impl Pipeline {
    fn new(session: SessionContext, gateway: Arc<dyn MediaGateway>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (stream_service, stream_rx) = ChatStreamService::new();
        let executor = CommandExecutor::new(
            Arc::new(stream_service),
            gateway,
            AppActionDispatcher::new(action_tx),
        );
        Self {
            app: App::new(session),
            executor,
            stream_rx,
            action_rx,
        }
    }

    fn apply(&mut self, action: AppAction) -> bool {
        match apply_action(&mut self.app, action, AppActionContext::default()) {
            Some(command) => {
                self.executor.execute(command);
                true
            }
            None => false,
        }
    }

    async fn recipe<W: Write>(&mut self, echo: &mut W) -> Result<String, RunError> {
        if !self.apply(AppAction::RequestSeed) {
            return Err(step_failed("recipe", &self.app, "seed request rejected"));
        }

        while let Some((message, stream_id)) = self.stream_rx.recv().await {
            if let StreamMessage::Chunk(content) = &message {
                echo.write_all(content.as_bytes())?;
                echo.flush()?;
            }
            let finished = !matches!(message, StreamMessage::Chunk(_));
            self.apply(stream_message_action(message, stream_id));
            if finished {
                break;
            }
        }
        writeln!(echo)?;

        match self.app.conversation.last_assistant_text() {
            Some(text) if !self.app.conversation.is_busy() => Ok(text.to_string()),
            _ => Err(step_failed("recipe", &self.app, "stream ended without a reply")),
        }
    }

    async fn media(&mut self, kind: MediaKind) -> Result<(), RunError> {
        let step = kind.label();
        let request = match kind {
            MediaKind::Image => AppAction::RequestImage,
            MediaKind::Audio => AppAction::RequestAudio,
        };
        if !self.apply(request) {
            return Err(step_failed(step, &self.app, "request rejected"));
        }

        let pending = |app: &App| match kind {
            MediaKind::Image => app.stage.is_busy_image(),
            MediaKind::Audio => app.stage.is_busy_audio(),
        };
        while pending(&self.app) {
            let Some(envelope) = self.action_rx.recv().await else {
                break;
            };
            if let Some(command) = apply_action(&mut self.app, envelope.action, envelope.context)
            {
                self.executor.execute(command);
            }
        }

        if self.app.stage.asset(kind).is_some() {
            Ok(())
        } else {
            Err(step_failed(step, &self.app, "no payload received"))
        }
    }

    fn write_media(&self, kind: MediaKind, out_dir: &Path) -> Result<Option<PathBuf>, RunError> {
        let Some(asset) = self.app.stage.asset(kind) else {
            return Ok(None);
        };
        let payload = asset.payload();
        let path = out_dir.join(format!("{}.{}", media_file_name(kind), payload.extension()));
        fs::write(&path, payload.bytes())?;
        info!(kind = kind.label(), path = %path.display(), bytes = payload.len(), "media written");
        Ok(Some(path))
    }
}

/// Run the whole pipeline, echoing the recipe to `echo`.
pub async fn run_pipeline<W: Write>(
    session: SessionContext,
    gateway: Arc<dyn MediaGateway>,
    options: &RunOptions,
    echo: &mut W,
) -> Result<RunReport, RunError> {
    fs::create_dir_all(&options.out_dir)?;
    let mut pipeline = Pipeline::new(session, gateway);

    let recipe = pipeline.recipe(echo).await?;
    let recipe_path = options.out_dir.join(RECIPE_FILE);
    fs::write(&recipe_path, format!("{}\n", recipe.trim_end()))?;
    let mut report = RunReport {
        recipe: recipe_path,
        ..RunReport::default()
    };

    if options.image {
        pipeline.media(MediaKind::Image).await?;
        report.image = pipeline.write_media(MediaKind::Image, &options.out_dir)?;

        if options.audio {
            pipeline.media(MediaKind::Audio).await?;
            report.audio = pipeline.write_media(MediaKind::Audio, &options.out_dir)?;
        }
    }

    pipeline.app.shutdown();
    Ok(report)
}
