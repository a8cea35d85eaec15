use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Validation service error: {0}")]
    Validation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Speech output error: {0}")]
    Speech(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
