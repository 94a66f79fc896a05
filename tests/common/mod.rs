//! Shared test support: scriptable Model Call Service implementations.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use asr_got_pipeline::error::{ModelError, ModelResult};
use asr_got_pipeline::model::{ModelCallService, ModelRequest, ModelResponse, TokenUsage};

/// Routes canned responses by prompt substring and records every request.
pub struct ScriptedModelService {
    rules: Vec<(String, String)>,
    fallback: String,
    calls: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModelService {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: "No structured content available.".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Respond with `response` when the prompt contains `needle`.
    /// Rules are checked in registration order.
    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn with_fallback(mut self, response: &str) -> Self {
        self.fallback = response.to_string();
        self
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl ModelCallService for ScriptedModelService {
    async fn call(&self, request: ModelRequest) -> ModelResult<ModelResponse> {
        let text = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone());
        self.calls.lock().unwrap().push(request);
        Ok(ModelResponse {
            text,
            usage: TokenUsage::new(50, 100),
        })
    }
}

/// Always fails with an API error.
pub struct FailingModelService;

#[async_trait]
impl ModelCallService for FailingModelService {
    async fn call(&self, _request: ModelRequest) -> ModelResult<ModelResponse> {
        Err(ModelError::Api {
            status: 500,
            message: "upstream exploded".to_string(),
        })
    }
}

/// Sleeps on prompts containing "slow" and records dispatch order.
/// With a single worker this makes priority ordering observable.
pub struct RecordingModelService {
    pub dispatched: Mutex<Vec<String>>,
    pub slow_delay: Duration,
}

impl RecordingModelService {
    pub fn new(slow_delay: Duration) -> Self {
        Self {
            dispatched: Mutex::new(Vec::new()),
            slow_delay,
        }
    }
}

#[async_trait]
impl ModelCallService for RecordingModelService {
    async fn call(&self, request: ModelRequest) -> ModelResult<ModelResponse> {
        self.dispatched.lock().unwrap().push(request.prompt.clone());
        if request.prompt.contains("slow") {
            tokio::time::sleep(self.slow_delay).await;
        }
        Ok(ModelResponse {
            text: format!("done: {}", request.prompt),
            usage: TokenUsage::new(1, 1),
        })
    }
}
