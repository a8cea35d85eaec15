//! Spoken-duration estimates from word counts.

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated time, in seconds, needed to speak `text` at `words_per_second`.
///
/// Empty or whitespace-only text is estimated at zero seconds.
pub fn estimate_duration(text: &str, words_per_second: f64) -> f64 {
    let count = word_count(text);
    if count == 0 {
        return 0.0;
    }
    count as f64 / words_per_second
}
