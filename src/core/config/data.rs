use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::chat_stream::StreamProtocol;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_CHAT_PATH: &str = "api/chat";
pub const DEFAULT_IMAGE_PATH: &str = "api/images";
pub const DEFAULT_AUDIO_PATH: &str = "api/audio";
pub const DEFAULT_SEED_PROMPT: &str = "Give me a random recipe";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Persisted settings. Every field is optional on disk; the accessors supply
/// defaults so an empty or missing file behaves like a fresh install.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Origin serving the chat, image and audio endpoints
    pub base_url: Option<String>,
    pub chat_path: Option<String>,
    pub image_path: Option<String>,
    pub audio_path: Option<String>,
    /// Line protocol of the chat endpoint ("data-stream" or "sse")
    pub stream_protocol: Option<StreamProtocol>,
    /// Model name forwarded with chat requests, if the endpoint wants one
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Text sent as the first user turn
    pub seed_prompt: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// Program used to open generated media, e.g. "xdg-open" or "mpv"
    pub open_command: Option<String>,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn chat_path(&self) -> &str {
        self.chat_path.as_deref().unwrap_or(DEFAULT_CHAT_PATH)
    }

    pub fn image_path(&self) -> &str {
        self.image_path.as_deref().unwrap_or(DEFAULT_IMAGE_PATH)
    }

    pub fn audio_path(&self) -> &str {
        self.audio_path.as_deref().unwrap_or(DEFAULT_AUDIO_PATH)
    }

    pub fn stream_protocol(&self) -> StreamProtocol {
        self.stream_protocol.unwrap_or_default()
    }

    pub fn seed_prompt(&self) -> &str {
        self.seed_prompt.as_deref().unwrap_or(DEFAULT_SEED_PROMPT)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
