use tracing::{debug, warn};

use super::{App, AppAction, AppActionContext, AppCommand};

const RETRY_HINT: &str = "press t to retry";

pub(super) fn handle_streaming_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::RequestSeed => request_seed(app),
        AppAction::RetrySeed => retry_seed(app),
        AppAction::AppendResponseChunk { content, stream_id } => {
            app.conversation.apply_fragment(stream_id, &content);
            None
        }
        AppAction::StreamErrored { message, stream_id } => {
            handle_stream_error(app, message, stream_id);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            finalize_stream(app, stream_id);
            None
        }
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

fn request_seed(app: &mut App) -> Option<AppCommand> {
    let prompt = app.session.seed_prompt.clone();
    match app.stage.request_seed(&mut app.conversation, &prompt) {
        Ok(request) => {
            app.ui.clear_status();
            app.ui.begin_activity();
            app.ui.follow_bottom();
            Some(AppCommand::SpawnStream(app.stream_params(request)))
        }
        Err(err) => {
            debug!("seed rejected: {err}");
            app.ui.set_status(err.to_string());
            None
        }
    }
}

fn retry_seed(app: &mut App) -> Option<AppCommand> {
    match app.stage.request_retry(&mut app.conversation) {
        Ok(request) => {
            app.ui.clear_status();
            app.ui.begin_activity();
            Some(AppCommand::SpawnStream(app.stream_params(request)))
        }
        Err(err) => {
            debug!("retry rejected: {err}");
            app.ui.set_status(err.to_string());
            None
        }
    }
}

fn handle_stream_error(app: &mut App, message: String, stream_id: u64) {
    if !app.conversation.fail_stream(stream_id) {
        return;
    }
    let message = message.trim();
    warn!(stream_id, "recipe stream failed: {message}");
    app.ui
        .set_status_with_hint(format!("Recipe stream failed: {message}"), RETRY_HINT);
}

fn finalize_stream(app: &mut App, stream_id: u64) {
    if !app.conversation.complete_stream(stream_id) {
        return;
    }
    if app.conversation.can_retry() {
        app.ui
            .set_status_with_hint("The server sent no recipe text", RETRY_HINT);
    }
}
