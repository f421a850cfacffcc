//! Interactive recipe session.
//!
//! [`run_chat`] owns the terminal for the lifetime of the session. The
//! shared [`App`] sits behind an [`AppHandle`] so background tasks and the
//! loop see one consistent state.

mod event_loop;
mod keybindings;
mod lifecycle;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::app::App;

pub use event_loop::{run_chat, UiEvent};
pub use keybindings::{KeyBindings, KeyCommand, KeyPattern};

#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Mutex<App>>,
}

impl AppHandle {
    pub fn new(inner: Arc<Mutex<App>>) -> Self {
        Self { inner }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::create_test_app;

    #[tokio::test]
    async fn updates_are_visible_to_readers() {
        let handle = AppHandle::new(Arc::new(Mutex::new(create_test_app())));
        let other = handle.clone();

        handle.update(|app| app.ui.set_status("Saved")).await;
        let status = other.read(|app| app.ui.status.clone()).await;
        assert_eq!(status.as_deref(), Some("Saved"));
    }
}
