//! Daemon configuration, loaded once at startup from a TOML file.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub language_model: LanguageModelConfig,
    pub generator: GeneratorConfig,
    /// Optional: when absent, the voice analysis endpoint is disabled.
    pub voice: Option<VoiceConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8565
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// The language-understanding collaborator used for sentence parsing.
#[derive(Debug, Deserialize)]
pub struct LanguageModelConfig {
    #[serde(default = "default_lm_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key. The key itself never lives
    /// in the config file.
    #[serde(default = "default_lm_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_lm_model")]
    pub model: String,
    #[serde(default = "default_lm_temperature")]
    pub temperature: f64,
    #[serde(default = "default_lm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_lm_base_url(),
            api_key_env: default_lm_api_key_env(),
            model: default_lm_model(),
            temperature: default_lm_temperature(),
            max_tokens: default_lm_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LanguageModelConfig {
    pub fn api_key(&self) -> Result<String, ConfigError> {
        key_from_env(&self.api_key_env)
    }
}

fn default_lm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lm_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_lm_model() -> String {
    "claude-3-opus-20240229".to_string()
}

fn default_lm_temperature() -> f64 {
    0.3
}

fn default_lm_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

/// The externally-served routine text generator.
#[derive(Debug, Deserialize)]
pub struct GeneratorConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Capacity of the per-situation dedup cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// How many generations to attempt before accepting a repeat.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_cache_capacity() -> u64 {
    256
}

fn default_max_attempts() -> u32 {
    3
}

/// Voice analysis collaborators (speech-to-text and emotion).
#[derive(Debug, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_stt_base_url")]
    pub stt_base_url: String,
    #[serde(default = "default_stt_api_key_env")]
    pub stt_api_key_env: String,
    #[serde(default = "default_hume_base_url")]
    pub hume_base_url: String,
    #[serde(default = "default_hume_api_key_env")]
    pub hume_api_key_env: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VoiceConfig {
    pub fn stt_api_key(&self) -> Result<String, ConfigError> {
        key_from_env(&self.stt_api_key_env)
    }

    pub fn hume_api_key(&self) -> Result<String, ConfigError> {
        key_from_env(&self.hume_api_key_env)
    }
}

fn default_stt_base_url() -> String {
    "https://speech.googleapis.com".to_string()
}

fn default_stt_api_key_env() -> String {
    "GOOGLE_STT_API_KEY".to_string()
}

fn default_hume_base_url() -> String {
    "https://api.hume.ai/v0/batch/jobs".to_string()
}

fn default_hume_api_key_env() -> String {
    "HUME_API_KEY".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_wait_secs() -> u64 {
    120
}

fn key_from_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingApiKey(name.to_string()))
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [generator]
            base_url = "http://127.0.0.1:8601"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 8565);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.language_model.model, "claude-3-opus-20240229");
        assert_eq!(config.language_model.temperature, 0.3);
        assert_eq!(config.generator.base_url, "http://127.0.0.1:8601");
        assert_eq!(config.generator.cache_capacity, 256);
        assert_eq!(config.generator.max_attempts, 3);
        assert!(config.voice.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [server]
            listen = "0.0.0.0"
            port = 8000

            [logging]
            level = "debug"

            [language_model]
            model = "claude-3-5-sonnet-20241022"
            temperature = 0.5
            timeout_secs = 30

            [generator]
            base_url = "http://10.0.0.5:8601"
            max_attempts = 5

            [voice]
            poll_interval_secs = 2
            max_wait_secs = 60
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.language_model.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.language_model.timeout_secs, 30);
        assert_eq!(config.generator.max_attempts, 5);

        let voice = config.voice.unwrap();
        assert_eq!(voice.poll_interval_secs, 2);
        assert_eq!(voice.max_wait_secs, 60);
        assert_eq!(voice.hume_base_url, "https://api.hume.ai/v0/batch/jobs");
    }

    #[test]
    fn test_generator_section_is_required() {
        assert!(toml::from_str::<Config>("").is_err());
    }
}
