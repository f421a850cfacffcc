use std::time::Instant;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::app::{App, UiState};
use crate::core::media::{format_size, MediaAsset, MediaKind};
use crate::core::message::Turn;
use crate::core::view::{AudioView, DisplayMode};

/// Draw one frame and record how far the transcript can scroll.
pub fn ui(f: &mut Frame, app: &mut App) {
    let max_scroll = draw(f, app);
    app.ui.set_max_scroll(max_scroll);
}

fn draw(f: &mut Frame, app: &App) -> u16 {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = format!(
        "Recipecast v{} • {}",
        env!("CARGO_PKG_VERSION"),
        app.stage.stage()
    );
    let mode = app.display_mode();

    let max_scroll = match mode {
        DisplayMode::Conversation {
            turns, busy_text, ..
        } => draw_transcript(f, chunks[0], &title, turns, busy_text, &app.ui),
        DisplayMode::ImageLoading => {
            draw_loading(f, chunks[0], &title, app.ui.pulse_start);
            0
        }
        DisplayMode::ImageResult {
            image,
            assistant_text,
            audio,
        } => draw_result(f, chunks[0], &title, image, assistant_text, audio, &app.ui),
    };

    f.render_widget(Paragraph::new(hint_line(&mode)), chunks[1]);

    let status = match app.ui.status_line() {
        Some(message) => Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(Color::Yellow),
        ))),
        None => Paragraph::new(""),
    };
    f.render_widget(status, chunks[2]);

    max_scroll
}

fn draw_transcript(
    f: &mut Frame,
    area: Rect,
    title: &str,
    turns: &[Turn],
    busy_text: bool,
    ui: &UiState,
) -> u16 {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    let mut lines = transcript_lines(turns, inner.width as usize);

    if busy_text {
        let indicator = Span::styled("...", pulse_style(ui.pulse_start));
        match turns.last() {
            Some(turn) if turn.is_assistant() && !turn.content().is_empty() => {
                lines.push(Line::from(vec![
                    Span::raw(" ".repeat(turn.role().display_prefix().width())),
                    indicator,
                ]));
            }
            Some(turn) if turn.is_assistant() => {
                // The empty reply already has a prefix line; replace it.
                lines.pop();
                lines.push(Line::from(vec![role_span(turn), indicator]));
            }
            _ => lines.push(Line::from(vec![
                Span::styled("AI: ", assistant_style()),
                indicator,
            ])),
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Press r for a random recipe.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let (offset, max_scroll) = scroll_window(lines.len(), inner.height, ui.scroll_from_bottom);
    f.render_widget(Paragraph::new(lines).block(block).scroll((offset, 0)), area);
    max_scroll
}

fn draw_loading(f: &mut Frame, area: Rect, title: &str, pulse_start: Instant) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let panel = centered(inner, 3);
    let text = vec![
        Line::from("Generating image"),
        Line::from(Span::styled("...", pulse_style(pulse_start))),
    ];
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), panel);
}

fn draw_result(
    f: &mut Frame,
    area: Rect,
    title: &str,
    image: &MediaAsset,
    assistant_text: &str,
    audio: AudioView<'_>,
    ui: &UiState,
) -> u16 {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(4), Constraint::Length(4)])
        .split(area);

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(chunks[0]);
    let lines: Vec<Line> = wrap_text(assistant_text, inner.width as usize)
        .into_iter()
        .map(Line::from)
        .collect();
    let (offset, max_scroll) = scroll_window(lines.len(), inner.height, ui.scroll_from_bottom);
    f.render_widget(
        Paragraph::new(lines).block(block).scroll((offset, 0)),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(asset_lines(image))
            .block(Block::default().borders(Borders::ALL).title("Image"))
            .wrap(Wrap { trim: false }),
        chunks[1],
    );

    let audio_lines = match audio {
        AudioView::Absent => vec![Line::from("Generate audio (press a)")],
        AudioView::Pending => vec![Line::from(vec![
            Span::raw("Generating audio"),
            Span::styled("...", pulse_style(ui.pulse_start)),
        ])],
        AudioView::Ready(asset) => asset_lines(asset),
    };
    f.render_widget(
        Paragraph::new(audio_lines)
            .block(Block::default().borders(Borders::ALL).title("Narration"))
            .wrap(Wrap { trim: false }),
        chunks[2],
    );

    max_scroll
}

fn asset_lines(asset: &MediaAsset) -> Vec<Line<'static>> {
    let payload = asset.payload();
    let location = asset
        .url()
        .unwrap_or_else(|| "(kept in memory only)".to_string());
    vec![
        Line::from(format!("{} • {}", payload.mime(), format_size(payload.len()))),
        Line::from(Span::styled(
            location,
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
    ]
}

fn hint_line(mode: &DisplayMode<'_>) -> Line<'static> {
    let mut hints: Vec<&str> = Vec::new();
    match mode {
        DisplayMode::Conversation { actions, .. } => {
            if actions.seed {
                hints.push("r Random Recipe");
            }
            if actions.retry {
                hints.push("t retry");
            }
            if actions.image {
                hints.push("i image");
            }
        }
        DisplayMode::ImageLoading => {}
        DisplayMode::ImageResult { audio, .. } => {
            hints.push(open_hint(MediaKind::Image));
            match audio {
                AudioView::Absent => hints.push("a narrate"),
                AudioView::Pending => {}
                AudioView::Ready(_) => hints.push(open_hint(MediaKind::Audio)),
            }
        }
    }
    hints.push("↑↓ scroll");
    hints.push("q quit");

    Line::from(Span::styled(
        hints.join("  •  "),
        Style::default().fg(Color::DarkGray),
    ))
}

fn open_hint(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "o open image",
        MediaKind::Audio => "p play audio",
    }
}

fn transcript_lines(turns: &[Turn], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, turn) in turns.iter().enumerate() {
        if index > 0 {
            lines.push(Line::from(""));
        }
        let indent = turn.role().display_prefix().width();
        let body = wrap_text(turn.content(), width.saturating_sub(indent));
        let mut body = body.into_iter();

        let first = body.next().unwrap_or_default();
        lines.push(Line::from(vec![role_span(turn), Span::raw(first)]));
        for rest in body {
            lines.push(Line::from(format!("{}{rest}", " ".repeat(indent))));
        }
    }
    lines
}

fn role_span(turn: &Turn) -> Span<'static> {
    let style = if turn.is_user() {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        assistant_style()
    };
    Span::styled(turn.role().display_prefix(), style)
}

fn assistant_style() -> Style {
    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
}

/// Brightness that rises and falls twice a second from `start`.
fn pulse_style(start: Instant) -> Style {
    let elapsed = start.elapsed().as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };

    let color = if pulse_intensity < 0.33 {
        Color::DarkGray
    } else if pulse_intensity < 0.66 {
        Color::Gray
    } else {
        Color::White
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Top offset for a bottom-anchored view, and the largest distance from the
/// bottom the view can scroll.
fn scroll_window(total_lines: usize, height: u16, scroll_from_bottom: u16) -> (u16, u16) {
    let total = u16::try_from(total_lines).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(height);
    let offset = max_scroll - scroll_from_bottom.min(max_scroll);
    (offset, max_scroll)
}

fn centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        x: area.x,
        y: area.y + (area.height - height) / 2,
        width: area.width,
        height,
    }
}

/// Word-wrap `text` to `width` display columns. Explicit newlines are kept,
/// a paragraph's leading indentation is repeated on its continuation lines,
/// and words wider than a line are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw in text.split('\n') {
        let paragraph = raw.strip_suffix('\r').unwrap_or(raw);
        let body = paragraph.trim_start_matches([' ', '\t']);
        let mut indent = paragraph[..paragraph.len() - body.len()].replace('\t', "    ");
        if indent.width() >= width {
            indent.clear();
        }
        let indent_width = indent.width();

        let mut line = indent.clone();
        let mut line_width = indent_width;

        for word in body.split(' ') {
            let word_width = word.width();
            let gap = usize::from(line.len() > indent.len());

            if line_width + gap + word_width <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += gap + word_width;
                continue;
            }

            if line.len() > indent.len() {
                out.push(std::mem::replace(&mut line, indent.clone()));
                line_width = indent_width;
            }

            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if line_width + ch_width > width && line.len() > indent.len() {
                    out.push(std::mem::replace(&mut line, indent.clone()));
                    line_width = indent_width;
                }
                line.push(ch);
                line_width += ch_width;
            }
        }
        out.push(line);
    }
    out
}
