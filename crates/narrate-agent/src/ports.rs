//! Capabilities the orchestrator drives but does not implement.
//!
//! Each trait is the only surface the turn state machine sees of its
//! collaborator, so tests can substitute in-memory fakes and deployments can
//! swap backends without touching the orchestration logic.

use crate::context::ChatContext;
use crate::error::AgentError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// One incremental piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationChunk {
    /// Text delta carried by this chunk, if any. Role-only and finish
    /// chunks carry none.
    pub content: Option<String>,
}

impl GenerationChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }
}

/// Stream of chunks; ends when the backend signals completion.
pub type FragmentStream = BoxStream<'static, Result<GenerationChunk, AgentError>>;

/// Streaming text generation (the language-model backend).
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn open_stream(&self, context: &ChatContext) -> Result<FragmentStream, AgentError>;
}

/// Text accepted by the validation service.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedText {
    pub text: String,
    /// Pre-trim duration estimate reported by the service.
    pub audio_length: Option<f64>,
}

/// Duration-budget validation of a complete response.
#[async_trait]
pub trait TextValidator: Send + Sync {
    async fn validate(&self, text: &str) -> Result<ValidatedText, AgentError>;
}

/// Speech synthesis and playback.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speaks `text`, returning once playback has finished or was cut short.
    ///
    /// With `allow_interruptions`, playback stops early when
    /// [`SpeechOutput::interrupt`] is called.
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<(), AgentError>;

    /// Signals that new user input arrived.
    fn interrupt(&self) {}
}
