//! Resolved connection settings for one run of the client.

use std::time::Duration;

use tracing::debug;

use crate::core::chat_stream::StreamProtocol;
use crate::core::config::data::Config;
use crate::core::gateway::HttpMediaGateway;
use crate::utils::url::{construct_api_url, is_http_url};

pub const BASE_URL_ENV: &str = "RECIPECAST_BASE_URL";
pub const API_KEY_ENV: &str = "RECIPECAST_API_KEY";

/// Values given on the command line; these win over config and environment.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub base_url: Option<String>,
    pub prompt: Option<String>,
}

pub struct SessionContext {
    pub client: reqwest::Client,
    pub chat_url: String,
    pub image_url: String,
    pub audio_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub protocol: StreamProtocol,
    pub seed_prompt: String,
    pub open_command: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SessionContext {
    pub fn from_config(
        config: &Config,
        overrides: &SessionOverrides,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Self::resolve(config, overrides, |key| std::env::var(key).ok())
    }

    /// Precedence for the base URL and API key: command line, then
    /// environment, then config file, then built-in default.
    pub fn resolve<E>(
        config: &Config,
        overrides: &SessionOverrides,
        env: E,
    ) -> Result<Self, Box<dyn std::error::Error>>
    where
        E: Fn(&str) -> Option<String>,
    {
        let base_url = non_empty(overrides.base_url.clone())
            .or_else(|| non_empty(env(BASE_URL_ENV)))
            .unwrap_or_else(|| config.base_url().to_string());
        if !is_http_url(&base_url) {
            return Err(format!("Invalid base URL '{base_url}': expected http:// or https://").into());
        }

        let api_key = non_empty(env(API_KEY_ENV)).or_else(|| non_empty(config.api_key.clone()));
        let seed_prompt = non_empty(overrides.prompt.clone())
            .unwrap_or_else(|| config.seed_prompt().to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .build()?;

        let session = SessionContext {
            client,
            chat_url: construct_api_url(&base_url, config.chat_path()),
            image_url: construct_api_url(&base_url, config.image_path()),
            audio_url: construct_api_url(&base_url, config.audio_path()),
            api_key,
            model: non_empty(config.model.clone()),
            protocol: config.stream_protocol(),
            seed_prompt,
            open_command: non_empty(config.open_command.clone()),
        };
        debug!(
            chat_url = %session.chat_url,
            protocol = session.protocol.as_str(),
            has_key = session.api_key.is_some(),
            "session resolved"
        );
        Ok(session)
    }

    /// The media gateway talking to this session's endpoints.
    pub fn media_gateway(&self) -> HttpMediaGateway {
        HttpMediaGateway::new(
            self.client.clone(),
            self.image_url.clone(),
            self.audio_url.clone(),
            self.api_key.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_point_at_local_server() {
        let session =
            SessionContext::resolve(&Config::default(), &SessionOverrides::default(), no_env)
                .unwrap();
        assert_eq!(session.chat_url, "http://localhost:3000/api/chat");
        assert_eq!(session.image_url, "http://localhost:3000/api/images");
        assert_eq!(session.audio_url, "http://localhost:3000/api/audio");
        assert_eq!(session.seed_prompt, "Give me a random recipe");
        assert_eq!(session.protocol, StreamProtocol::DataStream);
        assert!(session.api_key.is_none());
    }

    #[test]
    fn command_line_beats_environment_beats_config() {
        let config = Config {
            base_url: Some("http://config.example".to_string()),
            api_key: Some("config-key".to_string()),
            ..Default::default()
        };
        let env = |key: &str| match key {
            BASE_URL_ENV => Some("http://env.example/".to_string()),
            API_KEY_ENV => Some("env-key".to_string()),
            _ => None,
        };

        let session = SessionContext::resolve(&config, &SessionOverrides::default(), env).unwrap();
        assert_eq!(session.chat_url, "http://env.example/api/chat");
        assert_eq!(session.api_key.as_deref(), Some("env-key"));

        let overrides = SessionOverrides {
            base_url: Some("https://cli.example".to_string()),
            prompt: Some("Something spicy".to_string()),
        };
        let session = SessionContext::resolve(&config, &overrides, env).unwrap();
        assert_eq!(session.image_url, "https://cli.example/api/images");
        assert_eq!(session.seed_prompt, "Something spicy");
    }

    #[test]
    fn blank_values_fall_through() {
        let config = Config {
            model: Some("  ".to_string()),
            ..Default::default()
        };
        let overrides = SessionOverrides {
            base_url: Some(" ".to_string()),
            prompt: Some(String::new()),
        };
        let session = SessionContext::resolve(&config, &overrides, no_env).unwrap();
        assert_eq!(session.chat_url, "http://localhost:3000/api/chat");
        assert_eq!(session.seed_prompt, "Give me a random recipe");
        assert!(session.model.is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let overrides = SessionOverrides {
            base_url: Some("localhost:3000".to_string()),
            prompt: None,
        };
        let err = SessionContext::resolve(&Config::default(), &overrides, no_env)
            .err()
            .expect("relative URL must fail");
        assert!(err.to_string().contains("Invalid base URL"));
    }
}
