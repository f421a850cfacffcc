//! Event polling, dispatching, and UI rendering loop.
//!
//! The loop is the only place actions are applied. Key presses, stream
//! fragments and gateway completions all arrive as [`AppAction`]s on one
//! channel; commands returned by the reducer are handed to the
//! [`CommandExecutor`], whose tasks report back on the same channel.

use std::{
    error::Error,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use ratatui::prelude::Size;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::app::{
    apply_actions, stream_message_action, App, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, CommandExecutor, SessionContext,
};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::gateway::MediaGateway;
use crate::ui::renderer::ui;

use super::keybindings::KeyBindings;
use super::lifecycle::{restore_terminal, setup_terminal, SharedTerminal};
use super::AppHandle;

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

async fn is_exit_requested(app: &AppHandle) -> bool {
    app.read(|app| app.ui.exit_requested).await
}

async fn current_terminal_size(terminal: &SharedTerminal) -> Size {
    let terminal_guard = terminal.lock().await;
    terminal_guard.size().unwrap_or_default()
}

async fn try_draw_frame(
    app: &AppHandle,
    terminal: &SharedTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    let mut terminal_guard = terminal.lock().await;
    app.update(|app| terminal_guard.draw(|f| ui(f, app)).map(|_| ()))
        .await?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

struct EventProcessingOutcome {
    events_processed: bool,
    request_redraw: bool,
}

fn process_ui_events(
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    bindings: &KeyBindings,
    dispatcher: &AppActionDispatcher,
    term_size: Size,
) -> EventProcessingOutcome {
    let mut outcome = EventProcessingOutcome {
        events_processed: false,
        request_redraw: false,
    };
    let ctx = AppActionContext {
        term_width: term_size.width,
        term_height: term_size.height,
    };

    while let Ok(ev) = event_rx.try_recv() {
        outcome.events_processed = true;
        match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if let Some(command) = bindings.resolve(&key) {
                    debug!(?command, "key command");
                    dispatcher.dispatch_many([command.into_action()], ctx);
                    outcome.request_redraw = true;
                }
            }
            UiEvent::Crossterm(Event::Resize(_, _)) => {
                outcome.request_redraw = true;
            }
            UiEvent::Crossterm(_) => {}
        }
    }

    outcome
}

/// Move stream output onto the action channel. Consecutive chunks of one
/// stream are merged so a burst of fragments costs a single redraw.
fn process_stream_updates(
    dispatcher: &AppActionDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    term_width: u16,
    term_height: u16,
) -> bool {
    let mut received_any = false;
    let mut coalesced: Option<(u64, String)> = None;
    let mut actions = Vec::new();

    while let Ok((message, stream_id)) = rx.try_recv() {
        received_any = true;
        match message {
            StreamMessage::Chunk(content) => match coalesced.as_mut() {
                Some((id, buffer)) if *id == stream_id => buffer.push_str(&content),
                _ => {
                    flush_chunks(&mut coalesced, &mut actions);
                    coalesced = Some((stream_id, content));
                }
            },
            other => {
                flush_chunks(&mut coalesced, &mut actions);
                actions.push(stream_message_action(other, stream_id));
            }
        }
    }
    flush_chunks(&mut coalesced, &mut actions);

    if !actions.is_empty() {
        dispatcher.dispatch_many(
            actions,
            AppActionContext {
                term_width,
                term_height,
            },
        );
    }

    received_any
}

fn flush_chunks(coalesced: &mut Option<(u64, String)>, actions: &mut Vec<AppAction>) {
    if let Some((stream_id, content)) = coalesced.take() {
        actions.push(AppAction::AppendResponseChunk { content, stream_id });
    }
}

async fn drain_action_queue(
    app: &AppHandle,
    executor: &CommandExecutor,
    action_rx: &mut mpsc::UnboundedReceiver<AppActionEnvelope>,
) -> bool {
    let mut pending = Vec::new();
    while let Ok(envelope) = action_rx.try_recv() {
        pending.push(envelope);
    }

    if pending.is_empty() {
        return false;
    }

    let commands = app.update(|app| apply_actions(app, pending)).await;
    executor.execute_all(commands);
    true
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(
    session: SessionContext,
    gateway: Arc<dyn MediaGateway>,
) -> Result<(), Box<dyn Error>> {
    let app = AppHandle::new(Arc::new(tokio::sync::Mutex::new(App::new(session))));

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AppActionEnvelope>();
    let action_dispatcher = AppActionDispatcher::new(action_tx);

    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let executor = CommandExecutor::new(
        Arc::new(stream_service),
        gateway,
        action_dispatcher.clone(),
    );

    let terminal = setup_terminal()?;
    info!("interactive session started");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);
    let bindings = KeyBindings::new();

    const MAX_FPS: u64 = 30;
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if is_exit_requested(&app).await {
            break 'main_loop Ok(());
        }

        if let Err(e) = try_draw_frame(
            &app,
            &terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        )
        .await
        {
            break 'main_loop Err(e.into());
        }

        let term_size = current_terminal_size(&terminal).await;
        let event_outcome =
            process_ui_events(&mut event_rx, &bindings, &action_dispatcher, term_size);
        if event_outcome.request_redraw {
            request_redraw = true;
        }

        let received_any = process_stream_updates(
            &action_dispatcher,
            &mut stream_rx,
            term_size.width,
            term_size.height,
        );

        let actions_applied = drain_action_queue(&app, &executor, &mut action_rx).await;
        if received_any || actions_applied {
            request_redraw = true;
        }

        // The pulse animates while anything is in flight.
        if app.read(App::is_busy).await {
            request_redraw = true;
        }

        let idle = !event_outcome.events_processed && !received_any && !actions_applied;
        if idle {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    app.update(App::shutdown).await;
    event_reader_handle.abort();
    restore_terminal(&terminal).await?;
    info!("interactive session ended");

    result
}
