use std::time::Duration;

use anyhow::{Context, Result};
use gateway_core::Contents;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::{ContentGenerator, GenerateRequest};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Gemini `generateContent` over REST. The api key travels with each request.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::new(http, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let body = build_generate_body(request);
        debug!(
            model = %request.model,
            structured = request.config.response_schema.is_some(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", request.api_key.as_str())
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini non-success status {}: {}",
                status.as_u16(),
                upstream_error_message(&body)
            );
        }

        let payload: Value = response.json().await.context("Gemini parse failed")?;
        debug!(model = %request.model, status = status.as_u16(), "generateContent answered");

        extract_candidate_text(&payload).with_context(|| {
            let reason = payload
                .pointer("/promptFeedback/blockReason")
                .or_else(|| payload.pointer("/candidates/0/finishReason"))
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            format!("Gemini output text missing ({reason})")
        })
    }
}

/// JSON body of a `generateContent` call.
pub fn build_generate_body(request: &GenerateRequest) -> Value {
    let contents = match &request.contents {
        Contents::Text(text) => vec![json!({
            "role": "user",
            "parts": [{ "text": text }]
        })],
        Contents::Turns(turns) => turns
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role,
                    "parts": turn
                        .parts
                        .iter()
                        .map(|part| json!({ "text": part.text }))
                        .collect::<Vec<_>>()
                })
            })
            .collect(),
    };

    let mut generation_config = json!({ "temperature": request.config.temperature });
    if let Some(schema) = &request.config.response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }

    json!({
        "contents": contents,
        "systemInstruction": {
            "parts": [{ "text": request.config.system_instruction }]
        },
        "generationConfig": generation_config
    })
}

/// Concatenated text parts of the first candidate, skipping thought parts.
pub fn extract_candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")?
        .as_array()?;

    let mut text = String::new();
    let mut found = false;
    for part in parts {
        if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        if let Some(chunk) = part.get("text").and_then(Value::as_str) {
            text.push_str(chunk);
            found = true;
        }
    }

    found.then_some(text)
}

fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
