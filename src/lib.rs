//! Recipecast is a terminal client for a three-stage generation workflow:
//! a streamed recipe conversation, an illustration of the recipe, and an
//! audio narration of it.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the turn log, the stage state machine, the media gateways,
//!   and the pure view projection that decides what is on screen.
//! - [`ui`] renders the projected display mode and runs the interactive event
//!   loop that turns key presses into app actions.
//! - [`api`] defines the request/response payloads exchanged with the text,
//!   image, and audio endpoints.
//! - [`cli`] parses arguments and dispatches into the TUI, the headless
//!   pipeline runner, or configuration editing.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
