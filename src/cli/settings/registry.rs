//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    api_key_handler, audio_path_handler, base_url_handler, chat_path_handler,
    image_path_handler, model_handler, open_command_handler, seed_prompt_handler,
    StreamProtocolHandler, TimeoutHandler,
};
use super::{SettingError, SettingHandler};

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for usage output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(base_url_handler()));
        registry.register(Box::new(chat_path_handler()));
        registry.register(Box::new(image_path_handler()));
        registry.register(Box::new(audio_path_handler()));
        registry.register(Box::new(StreamProtocolHandler));
        registry.register(Box::new(model_handler()));
        registry.register(Box::new(api_key_handler()));
        registry.register(Box::new(seed_prompt_handler()));
        registry.register(Box::new(TimeoutHandler));
        registry.register(Box::new(open_command_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key. Underscores are accepted in place of dashes so
    /// the TOML field names work too.
    pub fn get(&self, key: &str) -> Result<&dyn SettingHandler, SettingError> {
        let normalized = key.trim().to_ascii_lowercase().replace('_', "-");
        self.handlers
            .get(normalized.as_str())
            .map(|h| h.as_ref())
            .ok_or_else(|| SettingError::UnknownKey(key.to_string()))
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
