//! Spoken-duration budgeting for generated text.
//!
//! Estimates how long a piece of text takes to speak aloud from its word
//! count and a fixed speaking rate, and trims text that would run over a
//! duration budget. Trimming keeps the opening and the closing of the text
//! and replaces the middle with a placeholder, so a listener still hears how
//! a long reply starts and how it concludes.
//!
//! Everything in this crate is pure: no I/O, no shared state. The
//! [`BudgetSettings`] type bundles the three tunables (maximum duration,
//! speaking rate, placeholder) and applies the validation rule used by the
//! `/validate-audio-length` endpoint.

pub mod estimate;
pub mod trim;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

pub use estimate::{estimate_duration, word_count};
pub use trim::trim_text;

/// Default speaking rate, in words per second.
pub const DEFAULT_WORDS_PER_SECOND: f64 = 2.0;

/// Default spoken-duration budget, in seconds.
pub const DEFAULT_MAX_DURATION_SECS: f64 = 60.0;

/// Default marker inserted where trimmed words were removed.
pub const DEFAULT_PLACEHOLDER: &str = "...";

/// Errors raised when budget settings are unusable.
#[derive(Debug, Error, PartialEq)]
pub enum BudgetError {
    #[error("words_per_second must be a positive finite number, got {0}")]
    InvalidWordsPerSecond(f64),

    #[error("max_duration_secs must be a positive finite number, got {0}")]
    InvalidMaxDuration(f64),
}

/// Request to validate a text against the duration budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimRequest {
    pub text: String,
    /// Precomputed duration estimate. Derived from `text` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_length: Option<f64>,
}

impl TrimRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio_length: None,
        }
    }
}

/// Result of validating a text against the duration budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimResponse {
    pub validated_text: String,
    /// Duration estimate of the text as submitted, before any trimming.
    pub audio_length: f64,
}

/// Tunables for duration estimation and trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSettings {
    /// Longest acceptable spoken duration, in seconds.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    /// Speaking rate used for estimates.
    #[serde(default = "default_words_per_second")]
    pub words_per_second: f64,

    /// Marker spoken in place of the removed middle section.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_max_duration_secs() -> f64 {
    DEFAULT_MAX_DURATION_SECS
}

fn default_words_per_second() -> f64 {
    DEFAULT_WORDS_PER_SECOND
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration_secs(),
            words_per_second: default_words_per_second(),
            placeholder: default_placeholder(),
        }
    }
}

impl BudgetSettings {
    /// Checks that the rate and the budget are usable.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError`] if either value is zero, negative, or not finite.
    pub fn check(&self) -> Result<(), BudgetError> {
        if !(self.words_per_second.is_finite() && self.words_per_second > 0.0) {
            return Err(BudgetError::InvalidWordsPerSecond(self.words_per_second));
        }
        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            return Err(BudgetError::InvalidMaxDuration(self.max_duration_secs));
        }
        Ok(())
    }

    /// Estimated spoken duration of `text` at the configured rate.
    pub fn estimate(&self, text: &str) -> f64 {
        estimate_duration(text, self.words_per_second)
    }

    /// Trims `text` to the configured budget, borrowing it when it already fits.
    pub fn trim<'a>(&self, text: &'a str) -> Cow<'a, str> {
        trim_text(
            text,
            self.max_duration_secs,
            self.words_per_second,
            &self.placeholder,
        )
    }

    /// Applies the validation rule to a request.
    ///
    /// The text is trimmed only when the supplied (or estimated) duration
    /// exceeds the budget. The returned `audio_length` is always the
    /// pre-trim value, so callers learn how far over budget the original
    /// content was.
    pub fn validate(&self, request: &TrimRequest) -> TrimResponse {
        let audio_length = request
            .audio_length
            .unwrap_or_else(|| self.estimate(&request.text));

        let validated_text = if audio_length > self.max_duration_secs {
            self.trim(&request.text).into_owned()
        } else {
            request.text.clone()
        };

        TrimResponse {
            validated_text,
            audio_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_passes_through() {
        let settings = BudgetSettings::default();
        let response = settings.validate(&TrimRequest::new("hello world"));
        assert_eq!(response.validated_text, "hello world");
        assert_eq!(response.audio_length, 1.0);
    }

    #[test]
    fn long_text_is_trimmed_and_reports_original_length() {
        let settings = BudgetSettings::default();
        let text = words(200);
        let response = settings.validate(&TrimRequest::new(text.clone()));

        assert_eq!(response.audio_length, 100.0);

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let expected = format!("{} ... {}", tokens[..60].join(" "), tokens[140..].join(" "));
        assert_eq!(response.validated_text, expected);
    }

    #[test]
    fn supplied_audio_length_overrides_estimate() {
        let settings = BudgetSettings::default();

        // A short text declared as over budget is run through the trimmer,
        // which leaves it alone because its word count still fits.
        let response = settings.validate(&TrimRequest {
            text: "hello world".to_string(),
            audio_length: Some(90.0),
        });
        assert_eq!(response.validated_text, "hello world");
        assert_eq!(response.audio_length, 90.0);

        // A long text declared as short is not trimmed at all.
        let text = words(200);
        let response = settings.validate(&TrimRequest {
            text: text.clone(),
            audio_length: Some(10.0),
        });
        assert_eq!(response.validated_text, text);
        assert_eq!(response.audio_length, 10.0);
    }

    #[test]
    fn exactly_at_budget_is_not_trimmed() {
        let settings = BudgetSettings::default();
        let text = words(120);
        let response = settings.validate(&TrimRequest::new(text.clone()));
        assert_eq!(response.audio_length, 60.0);
        assert_eq!(response.validated_text, text);
    }

    #[test]
    fn custom_budget_is_honoured() {
        let settings = BudgetSettings {
            max_duration_secs: 2.0,
            words_per_second: 1.0,
            placeholder: "[snip]".to_string(),
        };
        let response = settings.validate(&TrimRequest::new("one two three four five"));
        assert_eq!(response.validated_text, "one [snip] five");
        assert_eq!(response.audio_length, 5.0);
    }

    #[test]
    fn check_rejects_unusable_values() {
        let mut settings = BudgetSettings::default();
        assert!(settings.check().is_ok());

        settings.words_per_second = 0.0;
        assert_eq!(settings.check(), Err(BudgetError::InvalidWordsPerSecond(0.0)));

        settings.words_per_second = 2.0;
        settings.max_duration_secs = -1.0;
        assert_eq!(settings.check(), Err(BudgetError::InvalidMaxDuration(-1.0)));

        settings.max_duration_secs = f64::INFINITY;
        assert!(settings.check().is_err());
    }

    #[test]
    fn request_without_audio_length_serializes_without_field() {
        let json = serde_json::to_value(TrimRequest::new("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hi" }));

        let parsed: TrimRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(parsed.audio_length, None);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: BudgetSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, BudgetSettings::default());
    }
}
