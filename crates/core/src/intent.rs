use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{AiResponse, IntentionResult, IntentionSetting};

pub const DEFAULT_CATCH_ALL_LABEL: &str = "else";
pub const MAX_NUMBERED_LABELS: usize = 5;

pub const INTENT_INSTRUCTION_PREAMBLE: &str = r#"You are an intent recognition assistant. Your task is to analyse the user input and decide how it relates to each of several intentions.
For every intention, judge whether the user input is related to it and report the result as JSON.

You must output exactly this JSON shape:
{
    "intentions": [
        {
            "intention_name": "name of intention 1",
            "condition": true or false,
            "content": "summary of what the input says about this intention"
        },
        {
            "intention_name": "name of intention 2",
            "condition": true or false,
            "content": "summary of what the input says about this intention"
        }
    ]
}

Rules:
1. Evaluate the user input against every listed intention.
2. Provide both condition and content for every intention.
3. If the input is unrelated to an intention, set condition to false and still give a short content note.
4. The output must be valid JSON."#;

#[derive(Debug, Error)]
pub enum UpstreamParseError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("intention `{name}` has a non-boolean condition")]
    Condition { name: String },
    #[error("intention `{name}` has non-string content")]
    Content { name: String },
}

/// Labels in evaluation order: numbered labels without gaps, then the catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLabels {
    numbered: Vec<String>,
    catch_all: String,
}

impl IntentLabels {
    pub fn collect(setting: &IntentionSetting) -> Self {
        let numbered = setting
            .numbered()
            .into_iter()
            .flatten()
            .take(MAX_NUMBERED_LABELS)
            .map(ToString::to_string)
            .collect();
        let catch_all = setting
            .intention_else
            .clone()
            .unwrap_or_else(|| DEFAULT_CATCH_ALL_LABEL.to_string());

        Self {
            numbered,
            catch_all,
        }
    }

    pub fn numbered(&self) -> &[String] {
        &self.numbered
    }

    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    /// Number of labels including the catch-all.
    pub fn label_count(&self) -> usize {
        self.numbered.len() + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.numbered
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.catch_all.as_str()))
    }
}

pub fn compose_intent_instruction(labels: &IntentLabels) -> String {
    let mut instruction = String::from(INTENT_INSTRUCTION_PREAMBLE);
    instruction.push_str("\nAvailable intentions:\n");
    for label in labels.iter() {
        instruction.push_str("- ");
        instruction.push_str(label);
        instruction.push('\n');
    }
    instruction
}

/// Response schema handed to the upstream so it answers with an `intentions` array.
pub fn intention_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "intentions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "intention_name": { "type": "STRING" },
                        "condition": { "type": "BOOLEAN" },
                        "content": { "type": "STRING" }
                    }
                }
            }
        }
    })
}

pub fn not_found_content(label: &str) -> String {
    format!("not found for intention {label}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledIntentions {
    pub numbered: Vec<IntentionResult>,
    pub catch_all: IntentionResult,
}

impl ReconciledIntentions {
    /// Successful response carrying the raw upstream text and every slot.
    pub fn into_response(self, raw_text: impl Into<String>) -> AiResponse {
        let mut response = AiResponse::success(raw_text);
        for (index, result) in self.numbered.into_iter().enumerate() {
            if let Some(slot) = response.slot_mut(index + 1) {
                *slot = Some(result);
            }
        }
        response.intention_else_result = Some(self.catch_all);
        response
    }
}

/// Maps the upstream's `intentions` array onto the caller's slots.
///
/// Numbered label `i` fills slot `i + 1`. The first entry whose name matches a
/// label wins; a label with no entry gets a synthesized `condition: false`
/// result. A missing or non-array `intentions` field counts as an empty list.
pub fn reconcile_intentions(
    labels: &IntentLabels,
    raw_text: &str,
) -> Result<ReconciledIntentions, UpstreamParseError> {
    let parsed: Value = serde_json::from_str(raw_text)?;
    let entries = parsed
        .get("intentions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let numbered = labels
        .numbered()
        .iter()
        .map(|label| find_or_synthesize(label, entries))
        .collect::<Result<Vec<_>, _>>()?;
    let catch_all = find_or_synthesize(labels.catch_all(), entries)?;

    Ok(ReconciledIntentions {
        numbered,
        catch_all,
    })
}

fn find_or_synthesize(
    label: &str,
    entries: &[Value],
) -> Result<IntentionResult, UpstreamParseError> {
    let matched = entries
        .iter()
        .find(|entry| entry.get("intention_name").and_then(Value::as_str) == Some(label));

    let Some(entry) = matched else {
        return Ok(IntentionResult {
            intention_name: label.to_string(),
            condition: false,
            content: not_found_content(label),
        });
    };

    // Absent or null fields take their zero value; any other type is rejected.
    let condition = match entry.get("condition") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(UpstreamParseError::Condition {
                name: label.to_string(),
            })
        }
    };
    let content = match entry.get("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => {
            return Err(UpstreamParseError::Content {
                name: label.to_string(),
            })
        }
    };

    Ok(IntentionResult {
        intention_name: label.to_string(),
        condition,
        content,
    })
}
