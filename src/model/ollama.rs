use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use log::{debug, info};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{FragmentStream, ModelDescriptor, ModelRuntime};
use crate::config::Settings;
use crate::conversation::Message;
use crate::error::{ChatError, Result};

// A client for a local Ollama server
pub struct OllamaRuntime {
    server_url: String,
    client: Client,
    /// Whole-call limit for blocking requests. Streams only get it as a
    /// connect timeout, so a long but live stream is never cut off.
    timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One `/api/chat` body, or one line of it when streaming.
#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Option<Vec<OllamaTag>>,
}

#[derive(Debug, Deserialize)]
struct OllamaTag {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified_at: Option<String>,
}

impl From<OllamaTag> for ModelDescriptor {
    fn from(tag: OllamaTag) -> Self {
        ModelDescriptor {
            name: tag.name,
            size: tag.size.map(human_size),
            modified_at: tag
                .modified_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl OllamaRuntime {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        info!("Using Ollama runtime at: {}", settings.ollama_host);

        let mut builder = Client::builder();
        if let Some(timeout) = settings.runtime_timeout {
            info!("Runtime calls time out after {:?}", timeout);
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            server_url: settings.ollama_host.trim_end_matches('/').to_string(),
            client: builder.build()?,
            timeout: settings.runtime_timeout,
        })
    }

    async fn post_chat(&self, model: &str, messages: &[Message], stream: bool) -> Result<Response> {
        let url = format!("{}/api/chat", self.server_url);
        let payload = OllamaChatRequest {
            model,
            messages,
            stream,
        };

        info!(
            "Sending {} messages to {} (model: {}, stream: {})",
            messages.len(),
            url,
            model,
            stream
        );
        debug!("Payload: {:?}", payload);

        let mut request = self.client.post(&url).json(&payload);
        if let (Some(timeout), false) = (self.timeout, stream) {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        check_status(response, Some(model)).await
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    async fn complete_chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        let response = self.post_chat(model, messages, false).await?;
        let body = response.bytes().await?;
        let chunk: OllamaChatChunk = serde_json::from_slice(&body)?;
        debug!("Response: {:?}", chunk);

        if let Some(error) = chunk.error {
            return Err(runtime_reported(model, error));
        }

        let content = chunk
            .message
            .map(|m| m.content)
            .ok_or_else(|| ChatError::protocol("response has no message"))?;

        info!("Response length: {} characters", content.len());
        Ok(content)
    }

    async fn stream_chat(&self, model: &str, messages: &[Message]) -> Result<FragmentStream> {
        let response = self.post_chat(model, messages, true).await?;
        Ok(decode_fragments(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let url = format!("{}/api/tags", self.server_url);
        debug!("Listing models from {}", url);

        let mut request = self.client.get(&url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let response = check_status(response, None).await?;
        let body = response.bytes().await?;
        let tags: OllamaTags = serde_json::from_slice(&body)?;

        Ok(tags
            .models
            .unwrap_or_default()
            .into_iter()
            .map(ModelDescriptor::from)
            .collect())
    }
}

async fn check_status(response: Response, model: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<OllamaChatChunk>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or(text);

    match model {
        Some(model) if status == StatusCode::NOT_FOUND => {
            Err(ChatError::ModelNotFound(model.to_string()))
        }
        _ => Err(ChatError::protocol(format!("{} - {}", status, detail))),
    }
}

fn runtime_reported(model: &str, error: String) -> ChatError {
    if error.contains("not found") {
        ChatError::ModelNotFound(model.to_string())
    } else {
        ChatError::protocol(error)
    }
}

/// Ollama reports sizes in bytes; render them the way its CLI does.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Accumulates raw body bytes and hands out complete newline-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let pos = self.pending.iter().position(|b| *b == b'\n')?;
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Some(line);
            }
        }
    }

    fn has_remainder(&self) -> bool {
        !self.pending.iter().all(u8::is_ascii_whitespace)
    }
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    lines: LineBuffer,
    eof: bool,
    finished: bool,
}

/// Turns an NDJSON `/api/chat` body into text fragments. The stream ends
/// after the line marked `done`; a transport error, an `error` line, a
/// malformed line or a body that stops before `done` yields one
/// `RuntimeProtocol` item and then ends.
fn decode_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        lines: LineBuffer::default(),
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(line) = state.lines.next_line() {
                match parse_line(&line) {
                    Ok((text, true)) => {
                        state.finished = true;
                        if text.is_empty() {
                            return None;
                        }
                        return Some((Ok(text), state));
                    }
                    Ok((text, false)) if text.is_empty() => continue,
                    Ok((text, false)) => return Some((Ok(text), state)),
                    Err(err) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                }
            }

            if state.eof {
                state.finished = true;
                let err = ChatError::protocol("stream ended before the runtime finished");
                return Some((Err(err), state));
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.lines.push(bytes.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    let err = ChatError::protocol(format!("stream interrupted: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.eof = true;
                    if state.lines.has_remainder() {
                        state.lines.push(b"\n");
                    }
                }
            }
        }
    })
    .boxed()
}

fn parse_line(line: &[u8]) -> Result<(String, bool)> {
    let chunk: OllamaChatChunk = serde_json::from_slice(line)
        .map_err(|e| ChatError::protocol(format!("malformed stream line: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(ChatError::protocol(error));
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok((text, chunk.done))
}
