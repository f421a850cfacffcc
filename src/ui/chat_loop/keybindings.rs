//! Key bindings for the recipe screen.
//!
//! Every binding resolves to a [`KeyCommand`], which turns into the
//! [`AppAction`] the event loop dispatches. Whether the action is allowed in
//! the current stage is decided by the action handlers, not here.

use std::collections::HashMap;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::app::AppAction;
use crate::core::media::MediaKind;

const PAGE_LINES: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPattern {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyPattern {
    pub fn simple(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }
}

impl From<&KeyEvent> for KeyPattern {
    fn from(key: &KeyEvent) -> Self {
        // Terminals report Shift alongside upper-case characters; fold both
        // cases onto the plain binding.
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Self {
                code: KeyCode::Char(c.to_ascii_lowercase()),
                modifiers: key.modifiers.difference(KeyModifiers::SHIFT),
            },
            code => Self {
                code,
                modifiers: key.modifiers,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    RequestRecipe,
    RetryRecipe,
    RequestImage,
    RequestAudio,
    Open(MediaKind),
    ScrollUp(u16),
    ScrollDown(u16),
    Quit,
}

impl KeyCommand {
    pub fn into_action(self) -> AppAction {
        match self {
            KeyCommand::RequestRecipe => AppAction::RequestSeed,
            KeyCommand::RetryRecipe => AppAction::RetrySeed,
            KeyCommand::RequestImage => AppAction::RequestImage,
            KeyCommand::RequestAudio => AppAction::RequestAudio,
            KeyCommand::Open(kind) => AppAction::OpenMedia { kind },
            KeyCommand::ScrollUp(lines) => AppAction::ScrollUp { lines },
            KeyCommand::ScrollDown(lines) => AppAction::ScrollDown { lines },
            KeyCommand::Quit => AppAction::Quit,
        }
    }
}

pub struct KeyBindings {
    bindings: HashMap<KeyPattern, KeyCommand>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let bindings = [
            (KeyPattern::simple(KeyCode::Char('r')), KeyCommand::RequestRecipe),
            (KeyPattern::simple(KeyCode::Char('t')), KeyCommand::RetryRecipe),
            (KeyPattern::simple(KeyCode::Char('i')), KeyCommand::RequestImage),
            (KeyPattern::simple(KeyCode::Char('a')), KeyCommand::RequestAudio),
            (
                KeyPattern::simple(KeyCode::Char('o')),
                KeyCommand::Open(MediaKind::Image),
            ),
            (
                KeyPattern::simple(KeyCode::Char('p')),
                KeyCommand::Open(MediaKind::Audio),
            ),
            (KeyPattern::simple(KeyCode::Up), KeyCommand::ScrollUp(1)),
            (KeyPattern::simple(KeyCode::Char('k')), KeyCommand::ScrollUp(1)),
            (KeyPattern::simple(KeyCode::Down), KeyCommand::ScrollDown(1)),
            (KeyPattern::simple(KeyCode::Char('j')), KeyCommand::ScrollDown(1)),
            (
                KeyPattern::simple(KeyCode::PageUp),
                KeyCommand::ScrollUp(PAGE_LINES),
            ),
            (
                KeyPattern::simple(KeyCode::PageDown),
                KeyCommand::ScrollDown(PAGE_LINES),
            ),
            (KeyPattern::simple(KeyCode::Char('q')), KeyCommand::Quit),
            (KeyPattern::simple(KeyCode::Esc), KeyCommand::Quit),
            (KeyPattern::ctrl(KeyCode::Char('c')), KeyCommand::Quit),
        ]
        .into_iter()
        .collect();
        Self { bindings }
    }

    pub fn resolve(&self, key: &KeyEvent) -> Option<KeyCommand> {
        self.bindings.get(&KeyPattern::from(key)).copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn letter_keys_map_to_pipeline_steps() {
        let bindings = KeyBindings::new();
        let cases = [
            ('r', KeyCommand::RequestRecipe),
            ('t', KeyCommand::RetryRecipe),
            ('i', KeyCommand::RequestImage),
            ('a', KeyCommand::RequestAudio),
            ('o', KeyCommand::Open(MediaKind::Image)),
            ('p', KeyCommand::Open(MediaKind::Audio)),
        ];
        for (c, expected) in cases {
            assert_eq!(
                bindings.resolve(&key(KeyCode::Char(c), KeyModifiers::NONE)),
                Some(expected),
                "key {c}"
            );
        }
    }

    #[test]
    fn shifted_letters_use_the_same_binding() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.resolve(&key(KeyCode::Char('I'), KeyModifiers::SHIFT)),
            Some(KeyCommand::RequestImage)
        );
    }

    #[test]
    fn ctrl_c_quits_but_plain_c_does_nothing() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.resolve(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyCommand::Quit)
        );
        assert_eq!(
            bindings.resolve(&key(KeyCode::Char('c'), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn arrows_scroll() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.resolve(&key(KeyCode::Up, KeyModifiers::NONE)),
            Some(KeyCommand::ScrollUp(1))
        );
        assert_eq!(
            bindings.resolve(&key(KeyCode::PageDown, KeyModifiers::NONE)),
            Some(KeyCommand::ScrollDown(PAGE_LINES))
        );
    }

    #[test]
    fn commands_become_actions() {
        assert!(matches!(
            KeyCommand::Open(MediaKind::Audio).into_action(),
            AppAction::OpenMedia {
                kind: MediaKind::Audio
            }
        ));
        assert!(matches!(
            KeyCommand::ScrollUp(3).into_action(),
            AppAction::ScrollUp { lines: 3 }
        ));
    }
}
