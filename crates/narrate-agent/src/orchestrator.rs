//! Per-turn response orchestration.
//!
//! One [`Orchestrator::run_turn`] call drives a single turn through
//!
//! ```text
//!   Idle → Streaming → Validating → Speaking → Done
//!            │                          │
//!            └──────────► Failed ◄──────┘
//! ```
//!
//! Fragments are accumulated in delivery order and nothing is spoken until
//! the stream completes. The full response is then validated exactly once:
//! `Validating` is entered from `Streaming` only, and always leaves for
//! `Speaking`. When the validation service cannot be reached the
//! unvalidated response is spoken instead of dropping the turn, so there is
//! no `Validating → Failed` edge: the turn still ends `Done` and the
//! fallback is reported as [`ValidationOutcome::Fallback`]. `Failed` means
//! nothing was spoken.

use crate::context::ChatContext;
use crate::error::AgentError;
use crate::ports::{FragmentStream, ResponseGenerator, SpeechOutput, TextValidator};
use crate::usage::TurnMetrics;
use futures_util::StreamExt;
use narrate_budget::word_count;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Observable state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    Validating,
    Speaking,
    Done,
    Failed,
}

/// How the validation step resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The service answered; `trimmed` is set when it shortened the text.
    Validated {
        audio_length: Option<f64>,
        trimmed: bool,
    },
    /// The service was unreachable or rejected the request.
    Fallback,
}

/// Record of a finished turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// `Done` or `Failed`.
    pub state: TurnState,
    /// Every state the turn passed through, in order.
    pub transitions: Vec<TurnState>,
    /// Full generated response, once the stream completed.
    pub response: Option<String>,
    /// Text handed to speech output, once speech finished.
    pub spoken: Option<String>,
    pub validation: Option<ValidationOutcome>,
    pub error: Option<AgentError>,
}

impl TurnOutcome {
    fn new() -> Self {
        Self {
            state: TurnState::Idle,
            transitions: vec![TurnState::Idle],
            response: None,
            spoken: None,
            validation: None,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == TurnState::Done
    }

    /// Summarises the turn for usage accounting.
    pub fn metrics(&self) -> TurnMetrics {
        let (audio_length, trimmed, fallback) = match &self.validation {
            Some(ValidationOutcome::Validated {
                audio_length,
                trimmed,
            }) => (*audio_length, *trimmed, false),
            Some(ValidationOutcome::Fallback) => (None, false, true),
            None => (None, false, false),
        };

        TurnMetrics {
            completed: self.is_done(),
            response_words: self.response.as_deref().map(word_count).unwrap_or(0),
            spoken_words: self.spoken.as_deref().map(word_count).unwrap_or(0),
            audio_length,
            trimmed,
            fallback,
        }
    }
}

/// Append-only buffer for one response's fragments.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    fragments: usize,
}

impl ResponseAccumulator {
    /// Appends a fragment; empty fragments are ignored.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Consumes the buffer into the complete response.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Internal step of the state machine; carries the data each state owns.
enum Step {
    Idle,
    Streaming(FragmentStream),
    Validating(String),
    Speaking(String),
    Done,
    Failed(AgentError),
}

impl Step {
    fn state(&self) -> TurnState {
        match self {
            Step::Idle => TurnState::Idle,
            Step::Streaming(_) => TurnState::Streaming,
            Step::Validating(_) => TurnState::Validating,
            Step::Speaking(_) => TurnState::Speaking,
            Step::Done => TurnState::Done,
            Step::Failed(_) => TurnState::Failed,
        }
    }
}

/// Coordinates generation, validation and speech for individual turns.
///
/// Holds no per-turn state, so a single instance can serve any number of
/// concurrent turns.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn ResponseGenerator>,
    validator: Arc<dyn TextValidator>,
    speech: Arc<dyn SpeechOutput>,
    allow_interruptions: bool,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        validator: Arc<dyn TextValidator>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        Self {
            generator,
            validator,
            speech,
            allow_interruptions: true,
        }
    }

    /// Sets whether responses may be cut short by new user input. Default: true.
    pub fn with_interruptions(mut self, allow: bool) -> Self {
        self.allow_interruptions = allow;
        self
    }

    /// Runs one turn for `user_text` against a snapshot of the conversation.
    ///
    /// Never returns an error: failures end the turn in [`TurnState::Failed`]
    /// with the cause recorded in [`TurnOutcome::error`].
    pub async fn run_turn(&self, context: &ChatContext, user_text: &str) -> TurnOutcome {
        let mut outcome = TurnOutcome::new();
        let mut step = Step::Idle;

        loop {
            step = match step {
                Step::Idle => {
                    let seeded = context.with_user(user_text);
                    match self.generator.open_stream(&seeded).await {
                        Ok(stream) => Step::Streaming(stream),
                        Err(e) => Step::Failed(e),
                    }
                }
                Step::Streaming(stream) => match accumulate(stream).await {
                    Ok(text) => Step::Validating(text),
                    Err(e) => Step::Failed(e),
                },
                Step::Validating(text) => {
                    let spoken = match self.validator.validate(&text).await {
                        Ok(validated) => {
                            let trimmed = validated.text != text;
                            if trimmed {
                                info!(
                                    audio_length = ?validated.audio_length,
                                    original_words = word_count(&text),
                                    spoken_words = word_count(&validated.text),
                                    "response trimmed to duration budget"
                                );
                            }
                            outcome.validation = Some(ValidationOutcome::Validated {
                                audio_length: validated.audio_length,
                                trimmed,
                            });
                            validated.text
                        }
                        Err(e) => {
                            warn!(error = %e, "validation failed, speaking unvalidated response");
                            outcome.validation = Some(ValidationOutcome::Fallback);
                            text.clone()
                        }
                    };
                    outcome.response = Some(text);
                    Step::Speaking(spoken)
                }
                Step::Speaking(text) => {
                    match self.speech.say(&text, self.allow_interruptions).await {
                        Ok(()) => {
                            outcome.spoken = Some(text);
                            Step::Done
                        }
                        Err(e) => Step::Failed(e),
                    }
                }
                Step::Done => {
                    outcome.state = TurnState::Done;
                    return outcome;
                }
                Step::Failed(e) => {
                    warn!(error = %e, "turn failed");
                    outcome.state = TurnState::Failed;
                    outcome.error = Some(e);
                    return outcome;
                }
            };

            let state = step.state();
            debug!(?state, "turn state");
            outcome.transitions.push(state);
        }
    }
}

/// Drains the stream, concatenating non-empty fragments in delivery order.
async fn accumulate(mut stream: FragmentStream) -> Result<String, AgentError> {
    let mut accumulator = ResponseAccumulator::default();
    while let Some(chunk) = stream.next().await {
        if let Some(content) = chunk?.content {
            accumulator.push(&content);
        }
    }
    debug!(fragments = accumulator.fragments(), "response stream complete");
    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_skips_empty_fragments() {
        let mut acc = ResponseAccumulator::default();
        acc.push("Hel");
        acc.push("");
        acc.push("lo");
        assert_eq!(acc.fragments(), 2);
        assert_eq!(acc.finish(), "Hello");
    }

    #[test]
    fn metrics_reflect_fallback() {
        let mut outcome = TurnOutcome::new();
        outcome.state = TurnState::Done;
        outcome.response = Some("one two three".to_string());
        outcome.spoken = Some("one two three".to_string());
        outcome.validation = Some(ValidationOutcome::Fallback);

        let metrics = outcome.metrics();
        assert!(metrics.completed);
        assert!(metrics.fallback);
        assert!(!metrics.trimmed);
        assert_eq!(metrics.response_words, 3);
        assert_eq!(metrics.spoken_words, 3);
    }
}
