//! Provider-polymorphic chat-completion adapter.
//!
//! Grounded on `backend/core/llm_client.py` and `backend/core/api_config.py` from the
//! original implementation. Unlike the original, configuration is not a process-wide
//! mutable slot (`set_api_config`): it is an explicit [`LlmClient`] value threaded through
//! every stage and captured by the pipeline that owns a session.

mod client;

pub use client::{LlmCallResult, LlmClient, Message, Provider};

/// Default base URL per provider, pinned from `PROVIDER_CONFIG` in the original source.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openai" => "https://api.openai.com/v1/chat/completions",
        "anthropic" => "https://api.anthropic.com/v1/messages",
        "google" => "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
        "huggingface" => "https://api-inference.huggingface.co/v1/chat/completions",
        _ => "https://openrouter.ai/api/v1/chat/completions",
    }
}
