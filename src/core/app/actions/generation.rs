use tracing::debug;

use super::{App, AppAction, AppActionContext, AppCommand};
use crate::core::gateway::GatewayError;
use crate::core::media::{format_size, MediaAsset, MediaKind};

pub(super) fn handle_generation_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::RequestImage => request_media(app, MediaKind::Image),
        AppAction::RequestAudio => request_media(app, MediaKind::Audio),
        AppAction::MediaGenerated { kind, result } => {
            media_generated(app, kind, result);
            None
        }
        AppAction::OpenMedia { kind } => open_media(app, kind),
        _ => unreachable!("non-generation action routed to generation handler"),
    }
}

fn request_media(app: &mut App, kind: MediaKind) -> Option<AppCommand> {
    let requested = match kind {
        MediaKind::Image => app.stage.request_image(&app.conversation),
        MediaKind::Audio => app.stage.request_audio(&app.conversation),
    };
    match requested {
        Ok(text) => {
            app.ui.clear_status();
            app.ui.begin_activity();
            Some(AppCommand::GenerateMedia { kind, text })
        }
        Err(err) => {
            debug!(kind = kind.label(), "generation rejected: {err}");
            app.ui.set_status(err.to_string());
            None
        }
    }
}

fn media_generated(app: &mut App, kind: MediaKind, result: Result<MediaAsset, GatewayError>) {
    let applied = match (kind, result) {
        (MediaKind::Image, Ok(asset)) => app.stage.image_succeeded(asset),
        (MediaKind::Audio, Ok(asset)) => app.stage.audio_succeeded(asset),
        (MediaKind::Image, Err(err)) => app.stage.image_failed(&err),
        (MediaKind::Audio, Err(err)) => app.stage.audio_failed(&err),
    };
    if !applied {
        return;
    }

    match app.stage.last_error() {
        Some(error) => {
            let error = error.to_string();
            app.ui.set_status(error);
        }
        None => app.ui.clear_status(),
    }
}

fn open_media(app: &mut App, kind: MediaKind) -> Option<AppCommand> {
    let Some(asset) = app.stage.asset(kind) else {
        app.ui
            .set_status(format!("No {} has been generated yet", kind.label()));
        return None;
    };
    let Some(file) = asset.file() else {
        app.ui.set_status(format!(
            "The {} ({}) could not be written to disk",
            kind.label(),
            format_size(asset.payload().len())
        ));
        return None;
    };

    match app.session.open_command.clone() {
        Some(command) => Some(AppCommand::OpenMedia {
            command,
            path: file.path().to_path_buf(),
        }),
        None => {
            app.ui.set_status(format!(
                "{} saved at {} (set open-command to launch it)",
                kind.label(),
                file.url()
            ));
            None
        }
    }
}
