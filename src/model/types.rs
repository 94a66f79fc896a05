use serde::{Deserialize, Serialize};

/// Request capability flags.
///
/// Every request carries the base `Thinking` capability; the scheduler's
/// single-tool rule allows at most one of the additional capabilities on
/// top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Base reasoning capability (required on every request).
    Thinking,
    /// Web-search grounding.
    SearchGrounding,
    /// Schema-constrained structured output.
    StructuredOutput,
    /// Sandboxed code execution.
    CodeExecution,
    /// Tool/function calling.
    FunctionCalling,
    /// Provider-side prompt caching.
    Caching,
}

impl Capability {
    /// Whether this is the base capability rather than an additional one.
    pub fn is_base(&self) -> bool {
        matches!(self, Capability::Thinking)
    }
}

/// API credentials for the model providers.
///
/// Absence of all keys is an `ExecuteStage` precondition failure, not a
/// runtime error during calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Gemini API key.
    pub gemini: Option<String>,
    /// Perplexity API key (search-grounded requests).
    pub perplexity: Option<String>,
    /// Optional OpenAI API key.
    pub openai: Option<String>,
}

impl Credentials {
    /// True when at least one non-empty key is present.
    pub fn has_any(&self) -> bool {
        [&self.gemini, &self.perplexity, &self.openai]
            .iter()
            .any(|k| k.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false))
    }
}

/// Token usage reported by a model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input: u32,
    /// Completion tokens.
    pub output: u32,
    /// Total tokens.
    pub total: u32,
}

impl TokenUsage {
    /// Create a usage record; total is derived.
    pub fn new(input: u32, output: u32) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }

    /// Accumulate another usage record into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input += other.input;
        self.output += other.output;
        self.total += other.total;
    }
}

/// Generation options forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(2000),
        }
    }
}

/// A prompt for the Model Call Service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Full prompt text (system + user material).
    pub prompt: String,
    /// Requested capabilities.
    pub capabilities: Vec<Capability>,
    /// Optional JSON schema for structured output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Generation options.
    #[serde(default)]
    pub options: CallOptions,
}

impl ModelRequest {
    /// Create a thinking-only request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            capabilities: vec![Capability::Thinking],
            schema: None,
            options: CallOptions::default(),
        }
    }

    /// Add an additional capability.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Attach a JSON schema for structured output.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Override generation options.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the request asks for search grounding.
    pub fn wants_search(&self) -> bool {
        self.capabilities.contains(&Capability::SearchGrounding)
    }
}

/// Text completion returned by the Model Call Service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Completion text.
    pub text: String,
    /// Token usage for the call.
    #[serde(default)]
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_has_any() {
        assert!(!Credentials::default().has_any());

        let creds = Credentials {
            gemini: Some("".to_string()),
            perplexity: Some("   ".to_string()),
            openai: None,
        };
        assert!(!creds.has_any());

        let creds = Credentials {
            gemini: None,
            perplexity: Some("pk-123".to_string()),
            openai: None,
        };
        assert!(creds.has_any());
    }

    #[test]
    fn test_token_usage_derives_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total, 150);

        let mut acc = TokenUsage::default();
        acc.add(usage);
        acc.add(TokenUsage::new(10, 5));
        assert_eq!(acc.input, 110);
        assert_eq!(acc.output, 55);
        assert_eq!(acc.total, 165);
    }

    #[test]
    fn test_model_request_builder() {
        let request = ModelRequest::new("prompt")
            .with_capability(Capability::SearchGrounding)
            .with_capability(Capability::SearchGrounding);

        assert_eq!(
            request.capabilities,
            vec![Capability::Thinking, Capability::SearchGrounding]
        );
        assert!(request.wants_search());
    }

    #[test]
    fn test_capability_serializes_snake_case() {
        let json = serde_json::to_string(&Capability::SearchGrounding).unwrap();
        assert_eq!(json, "\"search_grounding\"");
    }
}
