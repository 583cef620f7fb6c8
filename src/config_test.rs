use super::*;
use tempfile::TempDir;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    // Model defaults
    assert_eq!(config.model.model, SpeechModel::WhisperBase);
    assert_eq!(config.model.language, "auto");
    assert_eq!(config.model.prompt, None);

    // Provider defaults
    assert_eq!(config.provider.backend, Backend::Gpu);
    assert!(config.provider.allow_local_models);
    assert!(config.provider.use_cache);
}

#[test]
fn test_load_valid_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
[model]
model = "whisper-base-en"
language = "en"
prompt = "lang:en [TRANSCRIBE]"

[provider]
backend = "cpu"
allow_local_models = false
use_cache = false
"#;

    std::fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from(&config_path).unwrap();

    assert_eq!(config.model.model, SpeechModel::WhisperBaseEn);
    assert_eq!(config.model.language, "en");
    assert_eq!(config.model.prompt.as_deref(), Some("lang:en [TRANSCRIBE]"));
    assert_eq!(config.provider.backend, Backend::Cpu);
    assert!(!config.provider.allow_local_models);
    assert!(!config.provider.use_cache);
}

#[test]
fn test_missing_config_file_returns_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent.toml");

    let config = Config::load_from(&config_path).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_toml_returns_error() {
    let invalid_toml = "this is not valid { toml [";

    let result = Config::parse(invalid_toml);

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("TOML"));
}

#[test]
fn test_invalid_model_name_returns_error() {
    let toml_content = r#"
[model]
model = "not-a-real-model"
"#;

    let result = Config::parse(toml_content);
    assert!(result.is_err());
}

#[test]
fn test_partial_config_uses_defaults_for_missing() {
    let partial_toml = r#"
[model]
model = "whisper-tiny"
"#;

    let config = Config::parse(partial_toml).unwrap();

    // Specified value
    assert_eq!(config.model.model, SpeechModel::WhisperTiny);
    // Default values for unspecified fields
    assert_eq!(config.model.language, "auto");
    assert_eq!(config.provider.backend, Backend::Gpu);
    assert!(config.provider.use_cache);
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let original = Config {
        model: ModelConfig {
            model: SpeechModel::WhisperMedium,
            language: "cs".to_string(),
            prompt: Some("technical vocabulary".to_string()),
        },
        provider: ProviderConfig {
            backend: Backend::Cpu,
            allow_local_models: false,
            use_cache: true,
        },
        logging: LoggingConfig {
            level: LogLevel::Debug,
        },
    };

    original.save_to(&config_path).unwrap();
    let loaded = Config::load_from(&config_path).unwrap();

    assert_eq!(original, loaded);
}

#[test]
fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested/dir/config.toml");

    let config = Config::default();
    config.save_to(&config_path).unwrap();

    assert!(config_path.exists());
}

#[test]
fn test_speech_model_serialization() {
    let config = Config {
        model: ModelConfig {
            model: SpeechModel::WhisperLargeV3Turbo,
            ..Default::default()
        },
        ..Default::default()
    };

    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("model = \"whisper-large-v3-turbo\""));
}

#[test]
fn test_backend_serialization() {
    let config = Config {
        provider: ProviderConfig {
            backend: Backend::Cpu,
            ..Default::default()
        },
        ..Default::default()
    };

    let toml_str = toml::to_string(&config).unwrap();
    assert!(toml_str.contains("backend = \"cpu\""));
}

#[test]
fn test_prompt_omitted_when_unset() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).unwrap();

    assert!(!toml_str.contains("prompt"));
}

#[test]
fn test_language_auto_detection() {
    let toml_content = r#"
[model]
language = "auto"
"#;

    let config = Config::parse(toml_content).unwrap();
    assert_eq!(config.model.language, "auto");
}
