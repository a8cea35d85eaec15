//! Narrate agent binary: answers messages typed on stdin with spoken replies.
//!
//! Each line read from stdin is one inbound message. The agent runs until
//! stdin closes (after finishing in-flight turns) or until SIGINT/SIGTERM,
//! then logs a usage summary.

use narrate_agent::session::DEFAULT_INBOUND_CAPACITY;
use narrate_agent::{
    config, usage_channel, AgentSession, ChatContext, CommandSpeaker, InboundMessage,
    OpenAiChatGenerator, Orchestrator, SpeechOutput, ValidationClient,
};
use narrate_runtime::{init_tracing, resolve_config_path, shutdown_signal};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path("NARRATE_AGENT_CONFIG_PATH");
    let selected_config_path = resolved_config_path.as_deref().or(Some("agent.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the agent cannot start without valid config");

    // Logs go to stderr, away from the interactive prompt.
    init_tracing(&config.logging.level, config.logging.json, std::io::stderr);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    tracing::info!(llm = ?config.llm, validation = %config.validation.url, "agent configuration");

    let generator = OpenAiChatGenerator::new(config.llm.clone())
        .expect("failed to build completion client");
    let validator =
        ValidationClient::new(&config.validation).expect("failed to build validation client");
    let speech: Arc<dyn SpeechOutput> = Arc::new(CommandSpeaker::from_config(&config.speech));

    let orchestrator = Orchestrator::new(Arc::new(generator), Arc::new(validator), speech.clone());

    let (usage, collector) = usage_channel();
    let collector = tokio::spawn(collector.run());

    let session = AgentSession::new(
        orchestrator,
        speech,
        ChatContext::with_system(&config.agent.system_prompt),
        usage,
    )
    .with_greeting(&config.agent.greeting);

    let (tx, rx) = mpsc::channel(DEFAULT_INBOUND_CAPACITY);
    tokio::spawn(read_stdin(tx));

    tracing::info!("agent ready; type a message and press enter");
    session.run(rx, shutdown_signal()).await;

    // Dropping the session releases the last usage sender.
    drop(session);
    match collector.await {
        Ok(summary) => tracing::info!(?summary, "usage summary"),
        Err(e) => tracing::warn!(error = %e, "usage collector failed"),
    }

    tracing::info!("narrate agent shut down");

    // A pending stdin read cannot be cancelled and would hold up runtime
    // shutdown until the next newline.
    std::process::exit(0);
}

/// Forwards stdin lines as inbound messages until EOF.
async fn read_stdin(tx: mpsc::Sender<InboundMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(InboundMessage::new("stdin", line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        }
    }
}
