//! Client for the text-to-shader generation service.
//!
//! The service takes a natural-language prompt and answers with GLSL, often
//! wrapped in Markdown code fences. [`ShaderGenClient::generate`] performs the
//! round-trip and strips the fences so the result can go straight to the
//! shader compiler.

mod client;
mod fence;

pub use client::{
    GeneratedShader, GenerationError, GeneratorConfig, ShaderGenClient, DEFAULT_ENDPOINT,
    DEFAULT_TIMEOUT,
};
pub use fence::strip_code_fences;
pub use reqwest::Url;
