use super::data::{Config, DEFAULT_BASE_URL, DEFAULT_SEED_PROMPT};
use super::io::ConfigError;
use crate::core::chat_stream::StreamProtocol;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    assert_eq!(config.seed_prompt(), DEFAULT_SEED_PROMPT);
    assert_eq!(config.stream_protocol(), StreamProtocol::DataStream);
    assert_eq!(config.request_timeout_secs(), 120);
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        base_url: Some("https://recipes.example.com".to_string()),
        stream_protocol: Some(StreamProtocol::Sse),
        request_timeout_secs: Some(30),
        ..Default::default()
    };
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);

    Config::mutate_at(&config_path, |config| {
        config.base_url = None;
        config.seed_prompt = Some("Something with lentils".to_string());
        Ok(())
    })
    .expect("mutate failed");

    let reloaded = Config::load_from_path(&config_path).expect("reload failed");
    assert_eq!(reloaded.base_url(), DEFAULT_BASE_URL);
    assert_eq!(reloaded.seed_prompt(), "Something with lentils");
    assert_eq!(reloaded.stream_protocol(), StreamProtocol::Sse);
}

#[test]
fn failed_mutation_leaves_file_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let original = Config {
        model: Some("chef-1".to_string()),
        ..Default::default()
    };
    original.save_to_path(&config_path).expect("save failed");

    let result: Result<(), _> = Config::mutate_at(&config_path, |config| {
        config.model = None;
        Err("rejected".into())
    });
    assert!(result.is_err());

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded.model.as_deref(), Some("chef-1"));
}

#[test]
fn protocol_is_stored_in_kebab_case() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "stream_protocol = \"data-stream\"\n").unwrap();

    let config = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(config.stream_protocol, Some(StreamProtocol::DataStream));

    let rendered = toml::to_string_pretty(&Config {
        stream_protocol: Some(StreamProtocol::Sse),
        ..Default::default()
    })
    .unwrap();
    assert!(rendered.contains("stream_protocol = \"sse\""));
}

#[test]
fn invalid_toml_reports_parse_error_with_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "base_url = [unterminated").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == &config_path));
    assert!(err.to_string().starts_with("Invalid config in"));
}

#[test]
fn unknown_protocol_is_a_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "stream_protocol = \"websocket\"\n").unwrap();

    assert!(matches!(
        Config::load_from_path(&config_path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn save_under_a_file_reports_write_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let config_path = blocker.join("config.toml");

    let err = Config::default().save_to_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Write { ref path, .. } if path == &config_path));
    assert!(err.to_string().starts_with("Could not save"));
}

#[test]
fn describe_masks_api_key_and_shows_defaults() {
    let config = Config {
        api_key: Some("sk-secret".to_string()),
        ..Default::default()
    };
    let lines = config.describe().join("\n");
    assert!(lines.contains("api-key: (set)"));
    assert!(!lines.contains("sk-secret"));
    assert!(lines.contains("base-url: (unset, default: http://localhost:3000)"));
    assert!(lines.contains("stream-protocol: (unset, default: data-stream)"));
}
