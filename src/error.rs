//! Typed error kinds for the research pipeline.
//!
//! Mirrors the taxonomy in the component design: configuration errors abort before a stage
//! starts, transport/validation/parsing errors are stage failures, state errors are
//! precondition violations, cancellation surfaces only to the transport. Fatal errors never
//! partially mutate `ContextState` — callers must check the error kind before committing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key for provider {0}")]
    MissingApiKey(String),
    #[error("missing prompt binding: {0}")]
    MissingPromptBinding(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("LLM timeout")]
    LlmTimeout,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("LLM call failed: {0}")]
    LlmCallFailed(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("URL failed SSRF validation: {0}")]
    UnsafeUrl(String),
    #[error("content-type not allowed: {0}")]
    DisallowedContentType(String),
    #[error("query too long ({len} > {max})")]
    QueryTooLong { len: usize, max: usize },
    #[error("URL too long ({len} > {max})")]
    UrlTooLong { len: usize, max: usize },
    #[error("no valid input remained after filtering")]
    NoValidInput,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parser {parser} yielded no primary artifacts")]
    NoArtifacts { parser: &'static str },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("precondition unmet: {0}")]
    PreconditionUnmet(String),
}

pub type Result<T> = std::result::Result<T, ResearchError>;
