//! Terminal UI for the interactive session.
//!
//! - [`chat_loop`]: the event loop that turns key presses and background
//!   results into actions and redraws.
//! - [`renderer`]: draws the projected display mode each frame.
//!
//! The UI only presents state and captures input; [`crate::core`] owns the
//! workflow.

pub mod chat_loop;
pub mod renderer;
