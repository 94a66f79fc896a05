use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{ModelCallService, ModelRequest, ModelResponse, TokenUsage};
use crate::config::{EndpointConfig, RequestConfig};
use crate::error::{ModelError, ModelResult};
use crate::model::Credentials;

/// Rough chars-per-token estimate used for the chunking threshold.
const CHARS_PER_TOKEN: usize = 4;

/// HTTP-backed Model Call Service.
///
/// Routes thinking requests to the Gemini endpoint and search-grounded
/// requests to Perplexity when a key is available. Retries with
/// exponential backoff, maps timeouts and quota responses to distinct
/// errors, and chunks oversized prompts with per-chunk error isolation.
#[derive(Clone)]
pub struct HttpModelClient {
    client: Client,
    endpoints: EndpointConfig,
    credentials: Credentials,
    request_config: RequestConfig,
}

impl HttpModelClient {
    /// Create a new client.
    pub fn new(
        endpoints: &EndpointConfig,
        credentials: &Credentials,
        request_config: RequestConfig,
    ) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ModelError::Http)?;

        Ok(Self {
            client,
            endpoints: endpoints.clone(),
            credentials: credentials.clone(),
            request_config,
        })
    }

    /// Pick the provider endpoint and key for a request.
    fn resolve_provider(&self, request: &ModelRequest) -> ModelResult<(String, String)> {
        let key_of = |k: &Option<String>| {
            k.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if request.wants_search() {
            if let Some(key) = key_of(&self.credentials.perplexity) {
                return Ok((self.endpoints.perplexity_base_url.clone(), key));
            }
        }
        if let Some(key) = key_of(&self.credentials.gemini) {
            return Ok((self.endpoints.gemini_base_url.clone(), key));
        }
        if let Some(key) = key_of(&self.credentials.perplexity) {
            return Ok((self.endpoints.perplexity_base_url.clone(), key));
        }
        Err(ModelError::Unavailable {
            message: "no API key configured for any provider".to_string(),
            retries: 0,
        })
    }

    /// Token-count estimate for the chunking threshold (len / 4 heuristic).
    fn estimate_tokens(text: &str) -> usize {
        text.len() / CHARS_PER_TOKEN
    }

    /// Split an oversized prompt into chunks at char boundaries.
    fn chunk_prompt(prompt: &str, token_limit: usize) -> Vec<String> {
        // A misconfigured limit of 0 must not panic chunks()
        let char_limit = (token_limit * CHARS_PER_TOKEN).max(1);
        let chars: Vec<char> = prompt.chars().collect();
        chars
            .chunks(char_limit)
            .map(|c| c.iter().collect())
            .collect()
    }

    async fn call_with_retry(&self, request: &ModelRequest) -> ModelResult<ModelResponse> {
        let (base_url, api_key) = self.resolve_provider(request)?;
        let url = format!("{}/v1/generate", base_url.trim_end_matches('/'));

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying model request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &api_key, request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        latency_ms = latency.as_millis(),
                        tokens = response.usage.total,
                        "Model call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Model call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ModelError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    async fn execute_request(
        &self,
        url: &str,
        api_key: &str,
        request: &ModelRequest,
    ) -> ModelResult<ModelResponse> {
        debug!(
            prompt_chars = request.prompt.len(),
            capabilities = request.capabilities.len(),
            "Calling model endpoint"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Quota {
                message: error_body,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let model_response: ModelResponse =
            response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(model_response)
    }
}

#[async_trait::async_trait]
impl ModelCallService for HttpModelClient {
    async fn call(&self, request: ModelRequest) -> ModelResult<ModelResponse> {
        if Self::estimate_tokens(&request.prompt) <= self.request_config.chunk_token_limit {
            return self.call_with_retry(&request).await;
        }

        // Oversized prompt: handle each chunk independently. A failed chunk
        // yields an inline marker instead of aborting the whole call.
        let chunks = Self::chunk_prompt(&request.prompt, self.request_config.chunk_token_limit);
        info!(
            chunks = chunks.len(),
            prompt_chars = request.prompt.len(),
            "Chunking oversized prompt"
        );

        let mut combined = String::new();
        let mut usage = TokenUsage::default();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let chunk_request = ModelRequest {
                prompt: chunk,
                capabilities: request.capabilities.clone(),
                schema: request.schema.clone(),
                options: request.options.clone(),
            };
            if !combined.is_empty() {
                combined.push('\n');
            }
            match self.call_with_retry(&chunk_request).await {
                Ok(response) => {
                    combined.push_str(&response.text);
                    usage.add(response.usage);
                }
                Err(e) => {
                    warn!(chunk = i + 1, error = %e, "Chunk failed, inserting marker");
                    combined.push_str(&format!("[Error processing chunk {}]", i + 1));
                }
            }
        }

        Ok(ModelResponse {
            text: combined,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Capability;

    fn test_client(credentials: Credentials) -> HttpModelClient {
        HttpModelClient::new(
            &EndpointConfig::default(),
            &credentials,
            RequestConfig::default(),
        )
        .expect("Failed to create test client")
    }

    #[test]
    fn test_client_creation() {
        let client = HttpModelClient::new(
            &EndpointConfig::default(),
            &Credentials::default(),
            RequestConfig::default(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_resolve_provider_prefers_perplexity_for_search() {
        let client = test_client(Credentials {
            gemini: Some("g-key".to_string()),
            perplexity: Some("p-key".to_string()),
            openai: None,
        });

        let search = ModelRequest::new("q").with_capability(Capability::SearchGrounding);
        let (url, key) = client.resolve_provider(&search).unwrap();
        assert!(url.contains("perplexity"));
        assert_eq!(key, "p-key");

        let thinking = ModelRequest::new("q");
        let (url, key) = client.resolve_provider(&thinking).unwrap();
        assert!(url.contains("generativelanguage"));
        assert_eq!(key, "g-key");
    }

    #[test]
    fn test_resolve_provider_falls_back_without_search_key() {
        let client = test_client(Credentials {
            gemini: Some("g-key".to_string()),
            perplexity: None,
            openai: None,
        });
        let search = ModelRequest::new("q").with_capability(Capability::SearchGrounding);
        let (_, key) = client.resolve_provider(&search).unwrap();
        assert_eq!(key, "g-key");
    }

    #[test]
    fn test_resolve_provider_no_keys() {
        let client = test_client(Credentials::default());
        let result = client.resolve_provider(&ModelRequest::new("q"));
        assert!(matches!(result, Err(ModelError::Unavailable { .. })));
    }

    #[test]
    fn test_chunk_prompt_splits_on_char_boundaries() {
        let prompt = "abcdefgh".repeat(10);
        let chunks = HttpModelClient::chunk_prompt(&prompt, 5);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), prompt);
        assert!(chunks.iter().all(|c| c.len() <= 20));
    }

    #[test]
    fn test_chunk_prompt_tolerates_zero_token_limit() {
        let chunks = HttpModelClient::chunk_prompt("abc", 0);
        assert_eq!(chunks.concat(), "abc");
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(HttpModelClient::estimate_tokens("abcd"), 1);
        assert_eq!(HttpModelClient::estimate_tokens(&"x".repeat(8000)), 2000);
    }
}
