//! Handlers for the individual configuration keys.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::SettingHandler;
use crate::core::chat_stream::StreamProtocol;
use crate::core::config::data::Config;
use crate::utils::url::{is_http_url, normalize_base_url};

/// Truncate a string to `max_chars` characters, appending "..." if truncated.
fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

/// Data-driven handler for free-text settings.
pub struct TextHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    /// Masks the value in success messages.
    secret: bool,
    normalize: fn(&'static str, String) -> Result<String, SettingError>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let value = (self.normalize)(self.key, input)?;
        let display = if self.secret {
            "(hidden)".to_string()
        } else {
            truncate_with_ellipsis(&value, 50)
        };
        (self.set_field)(config, Some(value));
        Ok(format!("✅ Set {} to: {display}", self.key))
    }

    fn unset(&self, config: &mut Config) -> String {
        (self.set_field)(config, None);
        format!("✅ Unset {}", self.key)
    }
}

fn keep_trimmed(_key: &'static str, input: String) -> Result<String, SettingError> {
    Ok(input.trim().to_string())
}

fn endpoint_path(_key: &'static str, input: String) -> Result<String, SettingError> {
    Ok(input.trim().trim_matches('/').to_string())
}

fn http_url(key: &'static str, input: String) -> Result<String, SettingError> {
    if !is_http_url(&input) {
        return Err(SettingError::InvalidValue {
            key,
            input,
            expected: "an absolute http:// or https:// URL",
        });
    }
    Ok(normalize_base_url(&input))
}

pub fn base_url_handler() -> TextHandler {
    TextHandler {
        key: "base-url",
        hint: "To set the server origin, provide a URL:",
        example: "recipecast set base-url http://localhost:3000",
        secret: false,
        normalize: http_url,
        set_field: |c, v| c.base_url = v,
    }
}

pub fn chat_path_handler() -> TextHandler {
    TextHandler {
        key: "chat-path",
        hint: "To set the chat endpoint path, provide it relative to the base URL:",
        example: "recipecast set chat-path api/chat",
        secret: false,
        normalize: endpoint_path,
        set_field: |c, v| c.chat_path = v,
    }
}

pub fn image_path_handler() -> TextHandler {
    TextHandler {
        key: "image-path",
        hint: "To set the image endpoint path, provide it relative to the base URL:",
        example: "recipecast set image-path api/images",
        secret: false,
        normalize: endpoint_path,
        set_field: |c, v| c.image_path = v,
    }
}

pub fn audio_path_handler() -> TextHandler {
    TextHandler {
        key: "audio-path",
        hint: "To set the audio endpoint path, provide it relative to the base URL:",
        example: "recipecast set audio-path api/audio",
        secret: false,
        normalize: endpoint_path,
        set_field: |c, v| c.audio_path = v,
    }
}

pub fn model_handler() -> TextHandler {
    TextHandler {
        key: "model",
        hint: "To send a model name with chat requests, provide it:",
        example: "recipecast set model gpt-4o-mini",
        secret: false,
        normalize: keep_trimmed,
        set_field: |c, v| c.model = v,
    }
}

pub fn api_key_handler() -> TextHandler {
    TextHandler {
        key: "api-key",
        hint: "To send a bearer token with every request, provide it:",
        example: "recipecast set api-key sk-...",
        secret: true,
        normalize: keep_trimmed,
        set_field: |c, v| c.api_key = v,
    }
}

pub fn seed_prompt_handler() -> TextHandler {
    TextHandler {
        key: "seed-prompt",
        hint: "To change the first message sent, provide the prompt text:",
        example: "recipecast set seed-prompt \"Give me a vegetarian recipe\"",
        secret: false,
        normalize: keep_trimmed,
        set_field: |c, v| c.seed_prompt = v,
    }
}

pub fn open_command_handler() -> TextHandler {
    TextHandler {
        key: "open-command",
        hint: "To open generated media, provide the program to launch:",
        example: "recipecast set open-command xdg-open",
        secret: false,
        normalize: keep_trimmed,
        set_field: |c, v| c.open_command = v,
    }
}

/// Handler for the `stream-protocol` setting.
pub struct StreamProtocolHandler;

impl SettingHandler for StreamProtocolHandler {
    fn key(&self) -> &'static str {
        "stream-protocol"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set the chat stream protocol, specify data-stream or sse:",
                example: "recipecast set stream-protocol sse",
            });
        }
        let protocol = StreamProtocol::parse(&input).ok_or(SettingError::InvalidValue {
            key: "stream-protocol",
            input,
            expected: "data-stream or sse",
        })?;
        config.stream_protocol = Some(protocol);
        Ok(format!("✅ Set stream-protocol to: {}", protocol.as_str()))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.stream_protocol = None;
        format!(
            "✅ Unset stream-protocol (will use default: {})",
            StreamProtocol::default().as_str()
        )
    }
}

/// Handler for the `request-timeout-secs` setting.
pub struct TimeoutHandler;

impl SettingHandler for TimeoutHandler {
    fn key(&self) -> &'static str {
        "request-timeout-secs"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set the request timeout, provide a number of seconds:",
                example: "recipecast set request-timeout-secs 60",
            });
        }
        let secs = input
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(SettingError::InvalidValue {
                key: "request-timeout-secs",
                input,
                expected: "a positive number of seconds",
            })?;
        config.request_timeout_secs = Some(secs);
        Ok(format!("✅ Set request-timeout-secs to: {secs}"))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.request_timeout_secs = None;
        format!(
            "✅ Unset request-timeout-secs (will use default: {})",
            config.request_timeout_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn base_url_is_validated_and_normalized() {
        let mut config = Config::default();
        let message = base_url_handler()
            .set(&args(&["https://recipes.example.com/"]), &mut config)
            .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://recipes.example.com"));
        assert!(message.contains("https://recipes.example.com"));

        let err = base_url_handler()
            .set(&args(&["localhost"]), &mut config)
            .unwrap_err();
        assert!(matches!(err, SettingError::InvalidValue { key: "base-url", .. }));
        assert_eq!(config.base_url.as_deref(), Some("https://recipes.example.com"));
    }

    #[test]
    fn multi_word_values_are_joined() {
        let mut config = Config::default();
        seed_prompt_handler()
            .set(&args(&["Give", "me", "soup"]), &mut config)
            .unwrap();
        assert_eq!(config.seed_prompt(), "Give me soup");
    }

    #[test]
    fn api_key_is_never_echoed() {
        let mut config = Config::default();
        let message = api_key_handler()
            .set(&args(&["sk-secret"]), &mut config)
            .unwrap();
        assert!(!message.contains("sk-secret"));
        assert_eq!(config.api_key.as_deref(), Some("sk-secret"));
    }

    #[test]
    fn missing_value_returns_hint() {
        let mut config = Config::default();
        let err = chat_path_handler().set(&[], &mut config).unwrap_err();
        assert!(matches!(err, SettingError::MissingArgs { .. }));
    }

    #[test]
    fn paths_lose_surrounding_slashes() {
        let mut config = Config::default();
        image_path_handler()
            .set(&args(&["/v2/images/"]), &mut config)
            .unwrap();
        assert_eq!(config.image_path(), "v2/images");
    }

    #[test]
    fn protocol_and_timeout_parse_their_values() {
        let mut config = Config::default();
        StreamProtocolHandler
            .set(&args(&["SSE"]), &mut config)
            .unwrap();
        assert_eq!(config.stream_protocol(), StreamProtocol::Sse);
        assert!(StreamProtocolHandler
            .set(&args(&["websocket"]), &mut config)
            .is_err());

        TimeoutHandler.set(&args(&["45"]), &mut config).unwrap();
        assert_eq!(config.request_timeout_secs(), 45);
        assert!(TimeoutHandler.set(&args(&["0"]), &mut config).is_err());

        TimeoutHandler.unset(&mut config);
        assert_eq!(config.request_timeout_secs(), 120);
    }
}
