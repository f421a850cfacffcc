//! Settings management for the `set` and `unset` commands.
//!
//! Each configuration key has a handler that validates the user's input and
//! writes it into a [`Config`]. Handlers only touch the in-memory config;
//! loading and persisting is done by the caller through
//! [`Config::mutate_at`].

pub mod error;
pub mod handlers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the words following the key.
    ///
    /// Returns a success message to display.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Unset (clear) the configuration value so the default applies again.
    fn unset(&self, config: &mut Config) -> String;
}
