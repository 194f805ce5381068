//! LLM provider adapters.
//!
//! Each provider implements the backend trait for its specific API.

mod openai;

pub use openai::{
    DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT, OpenAiBackend, OpenAiBackendBuilder,
};
