//! In-memory runtime for exercising the service and HTTP layers without Ollama.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{FragmentStream, ModelDescriptor, ModelRuntime};
use crate::conversation::Message;
use crate::error::{ChatError, Result};

/// Flips `released` when the stream holding it is dropped.
struct ConnectionGuard(Arc<AtomicBool>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct StubRuntime {
    reply: String,
    fragments: Vec<String>,
    /// Emit a protocol error after this many fragments instead of finishing.
    fail_after: Option<usize>,
    models: Vec<ModelDescriptor>,
    reachable: bool,
    pub chat_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub received: Mutex<Vec<(String, Vec<Message>)>>,
    pub released: Arc<AtomicBool>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self {
            reply: String::new(),
            fragments: Vec::new(),
            fail_after: None,
            models: Vec::new(),
            reachable: true,
            chat_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn replying(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    pub fn streaming(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn with_models(mut self, names: &[&str]) -> Self {
        self.models = names.iter().map(|n| ModelDescriptor::named(*n)).collect();
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
            + self.stream_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
    }

    fn connect(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(ChatError::unavailable("connection refused"))
        }
    }

    fn record(&self, model: &str, messages: &[Message]) {
        self.received
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
    }
}

#[async_trait]
impl ModelRuntime for StubRuntime {
    async fn complete_chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.connect()?;
        self.record(model, messages);
        Ok(self.reply.clone())
    }

    async fn stream_chat(&self, model: &str, messages: &[Message]) -> Result<FragmentStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.connect()?;
        self.record(model, messages);

        let mut items: Vec<Result<String>> = Vec::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if self.fail_after == Some(i) {
                break;
            }
            items.push(Ok(fragment.clone()));
        }
        if self.fail_after.is_some() {
            items.push(Err(ChatError::protocol("runtime dropped the stream")));
        }

        let guard = ConnectionGuard(self.released.clone());
        Ok(stream::iter(items)
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.connect()?;
        Ok(self.models.clone())
    }
}
