//! Language-model normalization of recognized form text.
//!
//! [`LlmClient`] speaks to the generative-text provider; [`Normalizer`] wraps
//! any [`TextGenerator`] with the extraction prompt and validates the reply.

pub mod client;
mod normalizer;

pub use client::{
    truncate_content, LlmClient, LlmConfig, LlmError, LlmProvider, PromptRevision, TextGenerator,
};
pub use normalizer::{parse_fields, strip_code_fences, NormalizeError, Normalizer};
