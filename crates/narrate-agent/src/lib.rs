//! Voice response agent for the Narrate platform.
//!
//! Answers text messages with spoken replies. Each inbound message starts an
//! independent turn that streams a response from the language-model backend,
//! submits the complete response once to the validation service (which trims
//! replies that would take too long to speak), and hands the result to speech
//! output.
//!
//! The language model, the validation service and speech output sit behind
//! the traits in [`ports`]; [`OpenAiChatGenerator`], [`ValidationClient`] and
//! [`CommandSpeaker`] are the stock implementations.

pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod ports;
pub mod session;
pub mod speech;
pub mod usage;
pub mod validation;

pub use config::{load_config, AgentConfig, ConfigError};
pub use context::{ChatContext, ChatMessage, ChatRole};
pub use error::AgentError;
pub use llm::OpenAiChatGenerator;
pub use orchestrator::{Orchestrator, TurnOutcome, TurnState, ValidationOutcome};
pub use ports::{
    FragmentStream, GenerationChunk, ResponseGenerator, SpeechOutput, TextValidator,
    ValidatedText,
};
pub use session::{AgentSession, InboundMessage};
pub use speech::CommandSpeaker;
pub use usage::{usage_channel, TurnMetrics, UsageCollector, UsageSender, UsageSummary};
pub use validation::ValidationClient;
