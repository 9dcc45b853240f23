pub mod ollama;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;

use crate::conversation::Message;
use crate::error::Result;

pub use ollama::OllamaRuntime;

/// Text fragments in the order the runtime produced them. Finite and
/// single-pass; dropping it closes the runtime connection.
pub type FragmentStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub size: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl ModelDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified_at: None,
        }
    }
}

/// What the gateway needs from a model-serving backend. Implementations map
/// every transport failure onto the typed `ChatError` set and never retry.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Blocking chat: waits for the full assistant reply.
    async fn complete_chat(&self, model: &str, messages: &[Message]) -> Result<String>;

    /// Streaming chat. Failures while opening the call are returned here;
    /// failures after that arrive as the last item of the stream.
    async fn stream_chat(&self, model: &str, messages: &[Message]) -> Result<FragmentStream>;

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;
}
