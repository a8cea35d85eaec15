//! Per-session usage accounting.
//!
//! Turns report a [`TurnMetrics`] record through a [`UsageSender`] without
//! waiting on anything; a single [`UsageCollector`] folds the records into a
//! [`UsageSummary`] that is logged when the session shuts down.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// What a single turn produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnMetrics {
    /// The turn reached speech output and finished it.
    pub completed: bool,
    /// Words generated by the backend.
    pub response_words: usize,
    /// Words handed to speech output.
    pub spoken_words: usize,
    /// Pre-trim duration estimate reported by the validation service.
    pub audio_length: Option<f64>,
    /// Validation shortened the response.
    pub trimmed: bool,
    /// Validation failed and the unvalidated response was spoken instead.
    pub fallback: bool,
}

/// Running totals across a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub turns: u64,
    pub completed_turns: u64,
    pub failed_turns: u64,
    pub trimmed_turns: u64,
    pub fallback_turns: u64,
    pub response_words: u64,
    pub spoken_words: u64,
    pub estimated_audio_secs: f64,
}

impl UsageSummary {
    pub fn collect(&mut self, metrics: &TurnMetrics) {
        self.turns += 1;
        if metrics.completed {
            self.completed_turns += 1;
        } else {
            self.failed_turns += 1;
        }
        if metrics.trimmed {
            self.trimmed_turns += 1;
        }
        if metrics.fallback {
            self.fallback_turns += 1;
        }
        self.response_words += metrics.response_words as u64;
        self.spoken_words += metrics.spoken_words as u64;
        self.estimated_audio_secs += metrics.audio_length.unwrap_or(0.0);
    }
}

/// Fire-and-forget handle for reporting turn metrics.
#[derive(Debug, Clone)]
pub struct UsageSender(mpsc::UnboundedSender<TurnMetrics>);

impl UsageSender {
    /// Reports `metrics`. Dropped silently if the collector is gone.
    pub fn record(&self, metrics: TurnMetrics) {
        let _ = self.0.send(metrics);
    }
}

/// Receives turn metrics until every [`UsageSender`] has been dropped.
#[derive(Debug)]
pub struct UsageCollector {
    rx: mpsc::UnboundedReceiver<TurnMetrics>,
    summary: UsageSummary,
}

impl UsageCollector {
    /// Drains metrics and returns the totals once all senders are gone.
    pub async fn run(mut self) -> UsageSummary {
        while let Some(metrics) = self.rx.recv().await {
            debug!(?metrics, "turn metrics");
            self.summary.collect(&metrics);
        }
        self.summary
    }
}

/// Creates a connected sender/collector pair.
pub fn usage_channel() -> (UsageSender, UsageCollector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        UsageSender(tx),
        UsageCollector {
            rx,
            summary: UsageSummary::default(),
        },
    )
}
