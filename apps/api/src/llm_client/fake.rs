//! Deterministic provider for tests. Replies are either scripted in order or computed
//! by a handler closure that can inspect the request (tool name, chunk text, retry notes).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{ChatCompletion, ChatProvider, ChatRequest, LlmError};

#[derive(Debug, Clone)]
pub enum FakeReply {
    Tool(Value),
    Text(String),
    Status(u16),
    Timeout,
    NoProvider,
}

impl FakeReply {
    pub fn tool(value: Value) -> Self {
        FakeReply::Tool(value)
    }

    fn into_result(self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        match self {
            FakeReply::Tool(v) => Ok(ChatCompletion::ToolCall {
                name: request.tool_name().unwrap_or("tool").to_string(),
                arguments: v.to_string(),
            }),
            FakeReply::Text(t) => Ok(ChatCompletion::Text(t)),
            FakeReply::Status(status) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            FakeReply::Timeout => Err(LlmError::Timeout(request.timeout)),
            FakeReply::NoProvider => Err(LlmError::NoProvider),
        }
    }
}

type Handler = Box<dyn Fn(&ChatRequest, usize) -> FakeReply + Send + Sync>;

pub struct FakeProvider {
    script: Mutex<VecDeque<FakeReply>>,
    handler: Option<Handler>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    /// Replies are consumed in call order; an exhausted script behaves like a 500.
    pub fn scripted(replies: Vec<FakeReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            handler: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The handler receives the request and the zero-based call index.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ChatRequest, usize) -> FakeReply + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls_for_tool(&self, tool: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.tool_name() == Some(tool))
            .count()
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let reply = match &self.handler {
            Some(handler) => handler(request, index),
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(FakeReply::Status(500)),
        };
        reply.into_result(request)
    }
}
