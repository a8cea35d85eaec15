//! Shared fakes and fixtures for agent integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use narrate_agent::config::ValidationConfig;
use narrate_agent::{
    AgentError, ChatContext, FragmentStream, GenerationChunk, ResponseGenerator, SpeechOutput,
    TextValidator, ValidatedText, ValidationClient,
};
use narrate_budget::BudgetSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One scripted stream item.
#[derive(Debug, Clone)]
pub enum Item {
    Text(&'static str),
    Empty,
    Fail(&'static str),
}

/// Generator replaying the same scripted stream for every turn.
#[derive(Default)]
pub struct ScriptedGenerator {
    items: Vec<Item>,
    fail_open: bool,
    hang: bool,
    gate: Option<(String, Arc<Notify>)>,
    contexts: Mutex<Vec<ChatContext>>,
}

impl ScriptedGenerator {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn fragments(fragments: &[&'static str]) -> Self {
        Self::new(fragments.iter().map(|f| Item::Text(*f)).collect())
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Opens a stream that never yields.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Holds back the stream for turns whose user message is `trigger` until
    /// `gate` is notified. Other turns stream immediately.
    pub fn gated_on(mut self, trigger: &str, gate: Arc<Notify>) -> Self {
        self.gate = Some((trigger.to_string(), gate));
        self
    }

    pub fn contexts(&self) -> Vec<ChatContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn open_stream(&self, context: &ChatContext) -> Result<FragmentStream, AgentError> {
        self.contexts.lock().unwrap().push(context.clone());

        if self.fail_open {
            return Err(AgentError::Generation("backend unavailable".to_string()));
        }
        if self.hang {
            return Ok(stream::pending().boxed());
        }
        if let Some((trigger, gate)) = &self.gate {
            let gated = context
                .messages()
                .last()
                .is_some_and(|m| m.content == *trigger);
            if gated {
                gate.notified().await;
            }
        }

        let items: Vec<Result<GenerationChunk, AgentError>> = self
            .items
            .iter()
            .map(|item| match item {
                Item::Text(t) => Ok(GenerationChunk::text(*t)),
                Item::Empty => Ok(GenerationChunk { content: None }),
                Item::Fail(msg) => Err(AgentError::Generation(msg.to_string())),
            })
            .collect();

        Ok(stream::iter(items).boxed())
    }
}

/// Wraps a validator and records every call.
pub struct CountingValidator {
    inner: Arc<dyn TextValidator>,
    calls: Mutex<Vec<String>>,
}

impl CountingValidator {
    pub fn new(inner: Arc<dyn TextValidator>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextValidator for CountingValidator {
    async fn validate(&self, text: &str) -> Result<ValidatedText, AgentError> {
        self.calls.lock().unwrap().push(text.to_string());
        self.inner.validate(text).await
    }
}

/// Speech output that records what it was asked to say.
#[derive(Default)]
pub struct RecordingSpeaker {
    said: Mutex<Vec<(String, bool)>>,
    interrupts: AtomicUsize,
    fail: bool,
}

impl RecordingSpeaker {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn said(&self) -> Vec<(String, bool)> {
        self.said.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.said().into_iter().map(|(text, _)| text).collect()
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeaker {
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<(), AgentError> {
        self.said
            .lock()
            .unwrap()
            .push((text.to_string(), allow_interruptions));
        if self.fail {
            return Err(AgentError::Speech("audio device busy".to_string()));
        }
        Ok(())
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Starts a real validation service on an ephemeral port and returns its base URL.
pub async fn spawn_validation_server(budget: BudgetSettings) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = narrate_server::app(narrate_server::AppState::new(budget));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Returns a base URL on which nothing is listening.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn validation_client(url: &str) -> ValidationClient {
    ValidationClient::new(&ValidationConfig {
        url: url.to_string(),
        timeout_secs: 5,
    })
    .expect("validation client")
}

pub fn distinct_words(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("word{i}")).collect()
}
