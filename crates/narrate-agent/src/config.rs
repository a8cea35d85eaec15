//! Agent configuration loading from file and environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a voice assistant. Your interface with users \
     will be voice. You should use short and concise responses, and avoid usage of \
     unpronounceable punctuation.";

/// Greeting spoken when a session starts, unless configured otherwise.
pub const DEFAULT_GREETING: &str = "Hey, how can I help you today?";

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub agent: PersonaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the validation service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Base URL of the validation service (the endpoint path is appended).
    #[serde(default = "default_validation_url")]
    pub url: String,

    /// Request timeout in seconds. Default: 10.
    #[serde(default = "default_validation_timeout_secs")]
    pub timeout_secs: u64,
}

/// OpenAI-compatible chat completion backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default, skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Speech output command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// TTS binary that reads the text to speak from stdin.
    #[serde(default = "default_speech_binary")]
    pub binary: String,

    /// Extra arguments passed to the binary.
    #[serde(default)]
    pub args: Vec<String>,

    /// Upper bound on a single utterance, in seconds. Default: 120.
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,
}

/// How the assistant presents itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Spoken when the session starts. Empty disables the greeting.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "narrate_agent=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_validation_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_validation_timeout_secs() -> u64 {
    10
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_speech_binary() -> String {
    "espeak-ng".to_string()
}

fn default_speech_timeout_secs() -> u64 {
    120
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            url: default_validation_url(),
            timeout_secs: default_validation_timeout_secs(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: String::new(),
            temperature: default_temperature(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            binary: default_speech_binary(),
            args: Vec::new(),
            timeout_secs: default_speech_timeout_secs(),
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `NARRATE_VALIDATION_URL` overrides `validation.url`
/// - `NARRATE_LLM_BASE_URL` overrides `llm.base_url`
/// - `NARRATE_LLM_MODEL` overrides `llm.model`
/// - `NARRATE_LLM_API_KEY` overrides `llm.api_key`
/// - `NARRATE_SPEECH_BINARY` overrides `speech.binary`
/// - `NARRATE_LOG_LEVEL` overrides `logging.level`
/// - `NARRATE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<AgentConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                AgentConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => AgentConfig::default(),
    };

    // Environment variable overrides
    if let Ok(url) = std::env::var("NARRATE_VALIDATION_URL") {
        config.validation.url = url;
    }
    if let Ok(base_url) = std::env::var("NARRATE_LLM_BASE_URL") {
        config.llm.base_url = base_url;
    }
    if let Ok(model) = std::env::var("NARRATE_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Ok(api_key) = std::env::var("NARRATE_LLM_API_KEY") {
        config.llm.api_key = api_key;
    }
    if let Ok(binary) = std::env::var("NARRATE_SPEECH_BINARY") {
        config.speech.binary = binary;
    }
    if let Ok(level) = std::env::var("NARRATE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("NARRATE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
