//! OpenAI adapter: bearer auth over the OpenAI-compatible wire dialect,
//! with chat, legacy prompt completions, streaming, and image generation.

mod adapter;
pub(crate) mod wire;

pub use adapter::{OPENAI_BASE_URL, OpenAiAdapter};
