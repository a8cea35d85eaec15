//! Streaming chat completions from an OpenAI-compatible backend.
//!
//! The backend streams Server-Sent Events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Each `data:` payload becomes one [`GenerationChunk`]. A stream that ends
//! before `[DONE]`, carries an `error` object, or contains unparseable JSON is
//! reported as a generation error so the turn is abandoned rather than
//! spoken half-finished.

use crate::config::LlmConfig;
use crate::context::ChatContext;
use crate::error::AgentError;
use crate::ports::{FragmentStream, GenerationChunk, ResponseGenerator};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::{debug, warn};

/// Generator backed by `POST {base_url}/chat/completions` with `stream: true`.
#[derive(Debug, Clone)]
pub struct OpenAiChatGenerator {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiChatGenerator {
    pub fn new(config: LlmConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client error: {e}")))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiChatGenerator {
    async fn open_stream(&self, context: &ChatContext) -> Result<FragmentStream, AgentError> {
        let body = json!({
            "model": self.config.model,
            "messages": context.messages(),
            "temperature": self.config.temperature,
            "stream": true,
        });

        let mut request = self.http.post(self.endpoint()).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Generation(format!(
                "completion request returned {}: {}",
                status, detail
            )));
        }

        debug!(model = %self.config.model, messages = context.len(), "opened completion stream");

        Ok(parse_sse_stream(response.bytes_stream()).boxed())
    }
}

/// State threaded through the `unfold` stream.
struct SseState<S> {
    stream: S,
    buf: BytesMut,
    done: bool,
}

/// Converts an SSE byte stream into generation chunks.
pub(crate) fn parse_sse_stream<S, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<GenerationChunk, AgentError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = st.buf.iter().position(|&b| b == b'\n') {
                let line = st.buf.split_to(line_end + 1);
                let line_str = String::from_utf8_lossy(&line);
                let trimmed = line_str.trim();

                // Blank separators, comments and non-data fields.
                let Some(data) = trimmed.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();

                if data == "[DONE]" {
                    return None;
                }

                return match parse_chunk(data) {
                    Ok(chunk) => Some((Ok(chunk), st)),
                    Err(e) => {
                        st.done = true;
                        Some((Err(e), st))
                    }
                };
            }

            match st.stream.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    warn!("upstream stream error: {e}");
                    st.done = true;
                    return Some((Err(AgentError::Generation(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    return Some((
                        Err(AgentError::Generation(
                            "stream ended before completion".to_string(),
                        )),
                        st,
                    ));
                }
            }
        }
    })
}

fn parse_chunk(data: &str) -> Result<GenerationChunk, AgentError> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| AgentError::Generation(format!("malformed stream chunk: {e}")))?;

    if let Some(error) = value.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(AgentError::Generation(message.to_string()));
    }

    Ok(GenerationChunk {
        content: value["choices"][0]["delta"]["content"]
            .as_str()
            .map(str::to_string),
    })
}
