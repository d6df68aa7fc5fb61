pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod parsers;
pub mod pipeline;
pub mod prompts;
pub mod search;
pub mod session_store;
pub mod validate;

pub use context::ContextState;
pub use error::{ResearchError, Result};
pub use llm::LlmClient;
