use serde::{Deserialize, Serialize};

use crate::chat::ChatRequest;
use crate::conversation::Message;

/// `POST /chat` and `POST /chat/stream` body as sent by clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "conversation_history")]
    pub history: Option<Vec<Message>>,
}

impl ChatRequestBody {
    /// Resolves the model once, here; a missing or blank model means the configured default.
    pub fn into_request(self, default_model: &str) -> ChatRequest {
        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        ChatRequest {
            message: self.message,
            model,
            history: self.history.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
