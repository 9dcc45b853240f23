use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use log::{error, info};
use serde::Serialize;
use uuid::Uuid;

use crate::conversation::{assemble, Message};
use crate::error::Result;
use crate::model::ModelRuntime;

/// A validated-shape chat request with its model already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub history: Vec<Message>,
}

#[cfg(test)]
impl ChatRequest {
    pub fn new(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResult {
    pub reply: String,
    pub model: String,
    /// The request history followed by the user turn and the assistant reply.
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamChunk {
    pub delta: String,
}

pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// Runs chat requests against a model runtime. Holds no per-request state.
pub struct ChatService {
    runtime: Arc<dyn ModelRuntime>,
}

impl ChatService {
    pub fn new(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self { runtime }
    }

    /// Either the full reply with the extended history, or an error and nothing else.
    pub async fn handle_chat(&self, request: &ChatRequest) -> Result<ChatResult> {
        let request_id = Uuid::new_v4();
        let mut messages = assemble(&request.history, &request.message)?;

        info!(
            "Chat request {} (model: {}, history: {} turns)",
            request_id,
            request.model,
            request.history.len()
        );

        let reply = self
            .runtime
            .complete_chat(&request.model, &messages)
            .await
            .map_err(|e| {
                error!("Chat request {} failed: {}", request_id, e);
                e
            })?;

        info!("Chat request {} answered ({} characters)", request_id, reply.len());

        messages.push(Message::assistant(reply.clone()));
        Ok(ChatResult {
            reply,
            model: request.model.clone(),
            history: messages,
        })
    }

    /// Streams the reply as deltas in the order the runtime produced them.
    ///
    /// No history is returned. A caller that keeps the conversation going
    /// must concatenate every `delta` and append the result as an assistant
    /// turn after the user message. A runtime failure after the stream opens
    /// arrives as its final item; to retry, issue a new call.
    pub async fn handle_chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let request_id = Uuid::new_v4();
        let messages = assemble(&request.history, &request.message)?;

        info!(
            "Stream request {} (model: {}, history: {} turns)",
            request_id,
            request.model,
            request.history.len()
        );

        let fragments = self
            .runtime
            .stream_chat(&request.model, &messages)
            .await
            .map_err(|e| {
                error!("Stream request {} failed to open: {}", request_id, e);
                e
            })?;

        Ok(fragments
            .map(move |fragment| match fragment {
                Ok(delta) => Ok(StreamChunk { delta }),
                Err(e) => {
                    error!("Stream request {} failed mid-stream: {}", request_id, e);
                    Err(e)
                }
            })
            .boxed())
    }
}
