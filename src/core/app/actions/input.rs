use super::{App, AppAction, AppActionContext, AppCommand};

pub(super) fn handle_input_action(
    app: &mut App,
    action: AppAction,
    _ctx: AppActionContext,
) -> Option<AppCommand> {
    match action {
        AppAction::SetStatus { message } => app.ui.set_status(message),
        AppAction::ClearStatus => app.ui.clear_status(),
        AppAction::ScrollUp { lines } => app.ui.scroll_up(lines),
        AppAction::ScrollDown { lines } => app.ui.scroll_down(lines),
        AppAction::Quit => app.shutdown(),
        _ => unreachable!("non-input action routed to input handler"),
    }
    None
}
