use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{ConfigError, ResearchError, TransportError};

/// One chat message: `role` ∈ {"system", "user", "assistant"}, `content` is plain text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// Outcome of a chat-completion call. `content` and `error` are mutually informative, not
/// mutually exclusive with `raw`: an empty/missing content field is not itself an error.
#[derive(Debug, Clone, Default)]
pub struct LlmCallResult {
    pub content: Option<String>,
    pub error: Option<String>,
    pub raw: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    OpenAi,
    Anthropic,
    Google,
    HuggingFace,
}

impl Provider {
    pub fn parse(s: &str) -> std::result::Result<Self, ConfigError> {
        match s {
            "openrouter" => Ok(Provider::OpenRouter),
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            "huggingface" => Ok(Provider::HuggingFace),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::HuggingFace => "huggingface",
        }
    }
}

/// Explicit, per-session LLM configuration — replaces the original's process-wide mutable
/// globals (`api_config.py`'s `_CURRENT_*` slots and `set_api_config()`). Cheaply cloneable.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    provider: Provider,
    api_key: Option<String>,
    base_url: String,
    work_model: String,
    final_model: String,
}

impl LlmClient {
    pub fn new(
        http: reqwest::Client,
        provider: Provider,
        api_key: Option<String>,
        base_url: String,
        work_model: String,
        final_model: String,
    ) -> Self {
        Self { http, provider, api_key, base_url, work_model, final_model }
    }

    /// Construct from a loaded [`crate::config::Settings`], preserving the ergonomic
    /// one-call setup the original's `set_api_config` offered without the shared state.
    pub fn from_settings(
        http: reqwest::Client,
        settings: &crate::config::Settings,
    ) -> std::result::Result<Self, ConfigError> {
        let provider_name = settings.llm.resolve_provider();
        let provider = Provider::parse(&provider_name)?;
        Ok(Self::new(
            http,
            provider,
            settings.llm.resolve_api_key(),
            settings.llm.resolve_base_url(&provider_name),
            settings.llm.resolve_work_model(),
            settings.llm.resolve_final_model(),
        ))
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn work_model(&self) -> &str {
        &self.work_model
    }

    pub fn final_model(&self) -> &str {
        &self.final_model
    }

    /// Headers for this provider, per `api_config.py::get_api_headers`.
    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Content-Type", "application/json".parse().unwrap());

        let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return headers;
        };

        if let Ok(v) = format!("Bearer {key}").parse() {
            headers.insert("Authorization", v);
        }
        if self.provider == Provider::Google {
            if let Ok(v) = key.parse() {
                headers.insert("x-goog-api-key", v);
            }
        }
        if self.provider == Provider::Anthropic {
            if let Ok(v) = key.parse() {
                headers.insert("x-api-key", v);
            }
            headers.insert("anthropic-version", "2023-06-01".parse().unwrap());
        }
        headers
    }

    /// Build the request body. Anthropic lifts the first system-role message to a top-level
    /// `system` field; all other providers send the OpenAI-shaped body with `temperature=0.3`.
    fn build_body(&self, messages: &[Message], model: &str, max_tokens: u32) -> Value {
        if self.provider == Provider::Anthropic {
            let mut system = String::new();
            let mut rest = Vec::new();
            for m in messages {
                if m.role == "system" && system.is_empty() {
                    system = m.content.clone();
                } else {
                    rest.push(json!({"role": m.role, "content": m.content}));
                }
            }
            let mut body = json!({
                "model": model,
                "messages": rest,
                "max_tokens": max_tokens,
            });
            if !system.is_empty() {
                body["system"] = json!(system);
            }
            body
        } else {
            json!({
                "model": model,
                "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
                "max_tokens": max_tokens,
                "temperature": 0.3,
            })
        }
    }

    /// Extract the assistant's text from a successful response body.
    fn parse_content(&self, body: &Value) -> Option<String> {
        if self.provider == Provider::Anthropic {
            body.get("content")?.get(0)?.get("text")?.as_str().map(|s| s.to_string())
        } else {
            body.get("choices")?.get(0)?.get("message")?.get("content")?.as_str().map(|s| s.to_string())
        }
    }

    /// Issue one chat-completion call. No retry at this layer — retries belong to the fetch
    /// layer (§4.4); here a timeout or non-2xx is surfaced directly as `LlmCallResult::error`.
    pub async fn call(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> LlmCallResult {
        let body = self.build_body(messages, model, max_tokens);

        let resp = self
            .http
            .post(&self.base_url)
            .headers(self.headers())
            .json(&body)
            .timeout(timeout)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return LlmCallResult { content: None, error: Some("LLM timeout".to_string()), raw: None };
            }
            Err(e) => {
                return LlmCallResult {
                    content: None,
                    error: Some(format!("LLM call failed: {e}")),
                    raw: None,
                };
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                return LlmCallResult {
                    content: None,
                    error: Some(format!("LLM call failed: {e}")),
                    raw: None,
                };
            }
        };
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|p| p.get("error"))
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| body.clone());
            return LlmCallResult {
                content: None,
                error: Some(format!("HTTP {}: {}", status.as_u16(), message)),
                raw: parsed,
            };
        }

        let payload = match parsed {
            Some(v) => v,
            None => {
                return LlmCallResult {
                    content: None,
                    error: Some(format!("LLM call failed: error decoding response body: {body}")),
                    raw: None,
                };
            }
        };

        let content = self.parse_content(&payload);
        if content.is_none() {
            tracing::warn!(provider = self.provider.as_str(), "LLM response had no content");
        }
        LlmCallResult { content, error: None, raw: Some(payload) }
    }

    /// Convert an `LlmCallResult` carrying a transport-level error into a typed error.
    pub fn transport_error(result: &LlmCallResult) -> Option<ResearchError> {
        let msg = result.error.as_ref()?;
        if msg == "LLM timeout" {
            Some(TransportError::LlmTimeout.into())
        } else if let Some(rest) = msg.strip_prefix("HTTP ") {
            let (code, message) = rest.split_once(": ").unwrap_or(("0", rest));
            Some(
                TransportError::Http {
                    status: code.parse().unwrap_or(0),
                    message: message.to_string(),
                }
                .into(),
            )
        } else {
            Some(TransportError::LlmCallFailed(msg.clone()).into())
        }
    }
}
