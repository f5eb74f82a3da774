use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::fence::strip_code_fences;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("invalid generator endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("generation service returned HTTP {status}")]
    Status { status: StatusCode },

    #[error("failed to reach generation service: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generation service sent a malformed response: {reason}")]
    MalformedResponse { reason: String },
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Parses `endpoint` as an http(s) base URL.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let invalid = |reason: String| GenerationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let endpoint_url = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
        if !matches!(endpoint_url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}'",
                endpoint_url.scheme()
            )));
        }
        if endpoint_url.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }
        Ok(Self {
            endpoint: endpoint_url,
            timeout,
        })
    }
}

/// Shader text returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
    /// The `response` field exactly as received.
    pub raw: String,
    /// `raw` with Markdown code fences removed.
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct ShaderGenClient {
    http: Client,
    prompt_url: Url,
}

impl ShaderGenClient {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenerationError::Transport)?;
        let prompt_url = prompt_url(&config.endpoint)?;
        Ok(Self { http, prompt_url })
    }

    pub fn prompt_url(&self) -> &Url {
        &self.prompt_url
    }

    /// Sends `prompt` to the service and returns the fence-stripped shader.
    pub fn generate(&self, prompt: &str) -> Result<GeneratedShader, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        debug!(url = %self.prompt_url, "requesting generated shader");
        let response = self
            .http
            .post(self.prompt_url.clone())
            .json(&PromptRequest { prompt })
            .send()
            .map_err(GenerationError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status { status });
        }

        let body = response.text().map_err(GenerationError::Transport)?;
        let payload: PromptResponse =
            serde_json::from_str(&body).map_err(|err| GenerationError::MalformedResponse {
                reason: err.to_string(),
            })?;

        let source = strip_code_fences(&payload.response);
        debug!(
            raw_len = payload.response.len(),
            source_len = source.len(),
            "received generated shader"
        );
        Ok(GeneratedShader {
            raw: payload.response,
            source,
        })
    }
}

fn prompt_url(endpoint: &Url) -> Result<Url, GenerationError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| GenerationError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        })?
        .pop_if_empty()
        .push("prompt");
    Ok(url)
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PromptResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ShaderGenClient {
        ShaderGenClient::new(GeneratorConfig::new(endpoint, DEFAULT_TIMEOUT).unwrap()).unwrap()
    }

    #[test]
    fn prompt_path_is_appended_to_endpoint() {
        assert_eq!(
            client(DEFAULT_ENDPOINT).prompt_url().as_str(),
            "http://localhost:5000/prompt"
        );
        assert_eq!(
            client("https://example.com/api/").prompt_url().as_str(),
            "https://example.com/api/prompt"
        );
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(matches!(
            GeneratorConfig::new("ftp://example.com", DEFAULT_TIMEOUT),
            Err(GenerationError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            GeneratorConfig::new("not a url", DEFAULT_TIMEOUT),
            Err(GenerationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn blank_prompt_fails_before_any_request() {
        // Port 9 (discard) is never contacted because validation runs first.
        let err = client("http://127.0.0.1:9").generate("   ").unwrap_err();
        assert!(matches!(err, GenerationError::EmptyPrompt));
    }

    #[test]
    fn response_field_is_required() {
        let err = serde_json::from_str::<PromptResponse>(r#"{"text": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("response"));
    }
}
