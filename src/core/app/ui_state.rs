use std::time::Instant;

/// Presentation state that is not part of the workflow: the status line,
/// transcript scrolling and the activity pulse.
#[derive(Debug)]
pub struct UiState {
    /// Lines scrolled up from the bottom of the transcript; 0 follows new text.
    pub scroll_from_bottom: u16,
    /// Largest useful `scroll_from_bottom`, reported by the renderer.
    pub max_scroll: u16,
    pub pulse_start: Instant,
    pub status: Option<String>,
    /// Key hint shown after the status; only meaningful in the interactive UI.
    pub status_hint: Option<&'static str>,
    pub status_set_at: Option<Instant>,
    pub exit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            scroll_from_bottom: 0,
            max_scroll: 0,
            pulse_start: Instant::now(),
            status: None,
            status_hint: None,
            status_set_at: None,
            exit_requested: false,
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
        self.status_hint = None;
        self.status_set_at = Some(Instant::now());
    }

    pub fn set_status_with_hint(&mut self, message: impl Into<String>, hint: &'static str) {
        self.set_status(message);
        self.status_hint = Some(hint);
    }

    pub fn clear_status(&mut self) {
        self.status = None;
        self.status_hint = None;
        self.status_set_at = None;
    }

    /// The status as drawn on screen, with its key hint appended.
    pub fn status_line(&self) -> Option<String> {
        let status = self.status.as_deref()?;
        Some(match self.status_hint {
            Some(hint) => format!("{status} ({hint})"),
            None => status.to_string(),
        })
    }

    pub fn auto_scroll(&self) -> bool {
        self.scroll_from_bottom == 0
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_from_bottom = self
            .scroll_from_bottom
            .saturating_add(lines)
            .min(self.max_scroll);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn follow_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }

    pub fn set_max_scroll(&mut self, max_scroll: u16) {
        self.max_scroll = max_scroll;
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_scroll);
    }

    /// Restart the pulse so a new activity begins at the same phase.
    pub fn begin_activity(&mut self) {
        self.pulse_start = Instant::now();
    }
}
