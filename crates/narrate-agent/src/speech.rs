use crate::config::SpeechConfig;
use crate::error::AgentError;
use crate::ports::SpeechOutput;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

/// Maximum text input size for a single utterance (64 KiB).
const MAX_SPEECH_INPUT_BYTES: usize = 64 * 1024;

/// Speech output through a local TTS command such as `espeak-ng`.
///
/// The command is started with the configured arguments, reads the text
/// from stdin and is expected to play it before exiting. Utterances play one
/// at a time in the order `say` was called.
#[derive(Debug)]
pub struct CommandSpeaker {
    binary: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    interrupts: Notify,
    /// Held for the whole playback of one utterance.
    playback: Mutex<()>,
}

impl CommandSpeaker {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            args,
            timeout,
            interrupts: Notify::new(),
            playback: Mutex::new(()),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(
            &config.binary,
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl SpeechOutput for CommandSpeaker {
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<(), AgentError> {
        if text.len() > MAX_SPEECH_INPUT_BYTES {
            return Err(AgentError::Speech(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_SPEECH_INPUT_BYTES
            )));
        }
        if text.trim().is_empty() {
            debug!("nothing to speak");
            return Ok(());
        }

        // Register before queueing so an interrupt while waiting is not lost.
        let interrupted = self.interrupts.notified();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();

        let _playing = tokio::select! {
            guard = self.playback.lock() => guard,
            () = &mut interrupted, if allow_interruptions => {
                info!("queued speech dropped by new input");
                return Ok(());
            }
        };

        // Dropping the child on any early return kills the process.
        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Speech(format!("Failed to spawn {:?}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Speech("Failed to open stdin".to_string()))?;
        let text_owned = text.to_string();

        // Closing stdin after the write marks the end of the utterance.
        let write_task = tokio::spawn(async move { stdin.write_all(text_owned.as_bytes()).await });

        tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait()) => {
                let status = result
                    .map_err(|_| {
                        AgentError::Speech(format!(
                            "speech process timed out after {} seconds",
                            self.timeout.as_secs_f32()
                        ))
                    })?
                    .map_err(|e| AgentError::Speech(format!("Failed to wait for {:?}: {}", self.binary, e)))?;

                if !status.success() {
                    return Err(AgentError::Speech(format!(
                        "{:?} exited with {}",
                        self.binary, status
                    )));
                }

                match write_task.await {
                    Ok(Ok(())) => Ok(()),
                    // The command finished without reading all of its input.
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        debug!("speech command closed stdin early");
                        Ok(())
                    }
                    Ok(Err(e)) => Err(AgentError::Speech(format!(
                        "Failed to write to {:?} stdin: {}",
                        self.binary, e
                    ))),
                    Err(e) => Err(AgentError::Speech(format!("Stdin task failed: {}", e))),
                }
            }
            () = &mut interrupted, if allow_interruptions => {
                write_task.abort();
                info!("speech interrupted by new input");
                Ok(())
            }
        }
    }

    fn interrupt(&self) {
        self.interrupts.notify_waiters();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn successful_command_completes() {
        let speaker = CommandSpeaker::new("true", Vec::new(), Duration::from_secs(5));
        speaker.say("hello", false).await.expect("true should succeed");
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let speaker = CommandSpeaker::new("false", Vec::new(), Duration::from_secs(5));
        let result = speaker.say("hello", false).await;
        assert!(matches!(result, Err(AgentError::Speech(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let speaker = CommandSpeaker::new(
            "/nonexistent/narrate-tts",
            Vec::new(),
            Duration::from_secs(5),
        );
        match speaker.say("hello", false).await {
            Err(AgentError::Speech(msg)) => assert!(msg.contains("Failed to spawn")),
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_text_is_rejected() {
        let speaker = CommandSpeaker::new("true", Vec::new(), Duration::from_secs(5));
        let text = "a".repeat(MAX_SPEECH_INPUT_BYTES + 1);
        assert!(speaker.say(&text, false).await.is_err());
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let speaker = CommandSpeaker::new("sleep", vec!["5".to_string()], Duration::from_millis(100));
        match speaker.say("hello", false).await {
            Err(AgentError::Speech(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dash_leading_text_is_spoken_not_parsed_as_flags() {
        let speaker = CommandSpeaker::new("cat", Vec::new(), Duration::from_secs(5));
        speaker
            .say("- first item, second item", false)
            .await
            .expect("bullet text should be read from stdin");
        speaker
            .say("--version", false)
            .await
            .expect("flag-like text should be read from stdin");
    }

    #[tokio::test]
    async fn text_reaches_the_command_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let speaker = CommandSpeaker::new(
            "sh",
            vec!["-c".to_string(), format!("cat > '{}'", out.display())],
            Duration::from_secs(5),
        );

        speaker.say("-5 degrees outside", false).await.expect("say");

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "-5 degrees outside");
    }

    #[tokio::test]
    async fn concurrent_utterances_play_one_after_another() {
        let speaker = Arc::new(CommandSpeaker::new(
            "sleep",
            vec!["0.3".to_string()],
            Duration::from_secs(5),
        ));
        let started = Instant::now();

        let first = {
            let speaker = speaker.clone();
            tokio::spawn(async move { speaker.say("first", false).await })
        };
        let second = {
            let speaker = speaker.clone();
            tokio::spawn(async move { speaker.say("second", false).await })
        };

        first.await.unwrap().expect("first utterance");
        second.await.unwrap().expect("second utterance");
        assert!(started.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn interruptible_speech_stops_on_interrupt() {
        let speaker = Arc::new(CommandSpeaker::new(
            "sleep",
            vec!["10".to_string()],
            Duration::from_secs(30),
        ));
        let started = Instant::now();

        let task = {
            let speaker = speaker.clone();
            tokio::spawn(async move { speaker.say("hello", true).await })
        };

        while !task.is_finished() {
            speaker.interrupt();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        task.await.unwrap().expect("interrupted speech is not an error");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn queued_interruptible_speech_is_dropped_on_interrupt() {
        let speaker = Arc::new(CommandSpeaker::new(
            "sleep",
            vec!["2".to_string()],
            Duration::from_secs(30),
        ));

        let playing = {
            let speaker = speaker.clone();
            tokio::spawn(async move { speaker.say("greeting", false).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let queued = {
            let speaker = speaker.clone();
            tokio::spawn(async move { speaker.say("reply", true).await })
        };

        while !queued.is_finished() {
            speaker.interrupt();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        queued.await.unwrap().expect("dropped speech is not an error");
        assert!(!playing.is_finished());
        playing.await.unwrap().expect("uninterruptible speech completes");
    }
}
