use crate::core::config::data::Config;

fn or_unset(value: Option<&str>, default: &str) -> String {
    match value {
        Some(value) => value.to_string(),
        None => format!("(unset, default: {default})"),
    }
}

impl Config {
    /// Lines describing every setting, in the order `recipecast config`
    /// prints them. The API key is masked.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("  base-url: {}", or_unset(self.base_url.as_deref(), self.base_url())),
            format!("  chat-path: {}", or_unset(self.chat_path.as_deref(), self.chat_path())),
            format!(
                "  image-path: {}",
                or_unset(self.image_path.as_deref(), self.image_path())
            ),
            format!(
                "  audio-path: {}",
                or_unset(self.audio_path.as_deref(), self.audio_path())
            ),
            format!(
                "  stream-protocol: {}",
                or_unset(
                    self.stream_protocol.map(|p| p.as_str()),
                    self.stream_protocol().as_str()
                )
            ),
        ];
        lines.push(match &self.model {
            Some(model) => format!("  model: {model}"),
            None => "  model: (unset)".to_string(),
        });
        lines.push(match &self.api_key {
            Some(_) => "  api-key: (set)".to_string(),
            None => "  api-key: (unset)".to_string(),
        });
        lines.push(format!(
            "  seed-prompt: {}",
            or_unset(self.seed_prompt.as_deref(), self.seed_prompt())
        ));
        lines.push(match self.request_timeout_secs {
            Some(secs) => format!("  request-timeout-secs: {secs}"),
            None => format!(
                "  request-timeout-secs: (unset, default: {})",
                self.request_timeout_secs()
            ),
        });
        lines.push(match &self.open_command {
            Some(command) => format!("  open-command: {command}"),
            None => "  open-command: (unset)".to_string(),
        });
        lines
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        for line in self.describe() {
            println!("{line}");
        }
    }
}
