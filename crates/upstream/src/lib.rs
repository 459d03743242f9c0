mod gemini;
mod scripted;

use anyhow::Result;
use gateway_core::Contents;
use serde_json::Value;

pub use gemini::{
    build_generate_body, extract_candidate_text, GeminiClient, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL,
};
pub use scripted::ScriptedGenerator;

/// One call to the upstream "generate content" capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub api_key: String,
    pub contents: Contents,
    pub config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub system_instruction: String,
    pub temperature: f64,
    /// When set the upstream must answer with JSON matching this schema.
    pub response_schema: Option<Value>,
}

pub trait ContentGenerator: Send + Sync {
    /// Returns the raw text produced by the model.
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub enum Upstream {
    Gemini(GeminiClient),
    Scripted(ScriptedGenerator),
}

impl Upstream {
    pub fn gemini(client: GeminiClient) -> Self {
        Self::Gemini(client)
    }

    pub fn scripted(generator: ScriptedGenerator) -> Self {
        Self::Scripted(generator)
    }
}

impl ContentGenerator for Upstream {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        match self {
            Upstream::Gemini(client) => client.generate(request).await,
            Upstream::Scripted(generator) => generator.generate(request).await,
        }
    }
}
