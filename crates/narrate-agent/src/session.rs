//! A conversational session: one inbound message source, one shared
//! conversation log, and an independent orchestrated turn per message.

use crate::context::{ChatContext, ChatRole};
use crate::orchestrator::Orchestrator;
use crate::ports::SpeechOutput;
use crate::usage::UsageSender;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default capacity for the inbound message channel.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// A text message from a participant.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }
}

/// Runs turns for every inbound message until the source closes or the
/// session is shut down.
pub struct AgentSession {
    orchestrator: Orchestrator,
    speech: Arc<dyn SpeechOutput>,
    /// Shared conversation log.
    ///
    /// Uses `std::sync::RwLock` intentionally: turns clone a snapshot when
    /// they start and append once when they finish, and neither access spans
    /// an `.await`.
    context: Arc<RwLock<ChatContext>>,
    usage: UsageSender,
    greeting: Option<String>,
}

impl AgentSession {
    pub fn new(
        orchestrator: Orchestrator,
        speech: Arc<dyn SpeechOutput>,
        context: ChatContext,
        usage: UsageSender,
    ) -> Self {
        Self {
            orchestrator,
            speech,
            context: Arc::new(RwLock::new(context)),
            usage,
            greeting: None,
        }
    }

    /// Speaks `greeting` (interruptibly) when the session starts. Empty
    /// strings disable the greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        self.greeting = (!greeting.trim().is_empty()).then_some(greeting);
        self
    }

    /// Returns a snapshot of the conversation log.
    pub fn context(&self) -> ChatContext {
        read_context(&self.context).clone()
    }

    /// Consumes inbound messages until `inbound` closes or `shutdown` resolves.
    ///
    /// When the source closes, in-flight turns are allowed to finish (unless
    /// `shutdown` fires first). On shutdown they are aborted; aborted or
    /// panicked turns are logged and never propagated.
    pub async fn run<F>(&self, mut inbound: mpsc::Receiver<InboundMessage>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut turns: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown);

        if let Some(greeting) = self.greeting.clone() {
            let speech = self.speech.clone();
            turns.spawn(
                async move {
                    if let Err(e) = speech.say(&greeting, true).await {
                        warn!(error = %e, "greeting failed");
                    }
                }
                .instrument(info_span!("greeting")),
            );
        }

        let mut shutting_down = false;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("session shutting down");
                    shutting_down = true;
                    break;
                }
                message = inbound.recv() => match message {
                    Some(message) => self.spawn_turn(&mut turns, message),
                    None => {
                        info!("inbound message source closed");
                        break;
                    }
                },
                Some(joined) = turns.join_next(), if !turns.is_empty() => log_join(joined),
            }
        }

        if !shutting_down {
            loop {
                tokio::select! {
                    () = &mut shutdown => {
                        info!(in_flight = turns.len(), "session shutting down");
                        break;
                    }
                    joined = turns.join_next() => match joined {
                        Some(joined) => log_join(joined),
                        None => break,
                    },
                }
            }
        }

        turns.abort_all();
        while let Some(joined) = turns.join_next().await {
            log_join(joined);
        }
    }

    fn spawn_turn(&self, turns: &mut JoinSet<()>, message: InboundMessage) {
        let text = message.text.trim().to_string();
        if text.is_empty() {
            debug!(sender = %message.sender, "ignoring empty message");
            return;
        }

        // New input cuts off interruptible speech that is still playing.
        self.speech.interrupt();

        let snapshot = read_context(&self.context).clone();
        let orchestrator = self.orchestrator.clone();
        let log = self.context.clone();
        let usage = self.usage.clone();

        let span = info_span!("turn", turn_id = %Uuid::new_v4(), sender = %message.sender);
        turns.spawn(
            async move {
                info!("turn started");
                let outcome = orchestrator.run_turn(&snapshot, &text).await;

                if let Some(spoken) = outcome.spoken.as_deref().filter(|_| outcome.is_done()) {
                    let mut log = write_context(&log);
                    log.append(ChatRole::User, text.as_str());
                    log.append(ChatRole::Assistant, spoken);
                }

                usage.record(outcome.metrics());
                info!(state = ?outcome.state, "turn finished");
            }
            .instrument(span),
        );
    }
}

fn log_join(joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("turn abandoned"),
        Err(e) => error!(error = %e, "turn task panicked"),
    }
}

fn read_context(context: &RwLock<ChatContext>) -> RwLockReadGuard<'_, ChatContext> {
    match context.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            // The log is only ever appended to, so a poisoned guard still
            // holds a coherent conversation.
            error!("conversation log lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write_context(context: &RwLock<ChatContext>) -> RwLockWriteGuard<'_, ChatContext> {
    match context.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("conversation log lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
