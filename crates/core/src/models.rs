use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Request body accepted by the chat endpoint, exactly as the caller sent it.
///
/// `input` stays untyped here: whether it is text or a message list is decided
/// once by [`crate::validate_request`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(
        default,
        rename = "messageList",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_list: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
    #[serde(
        default,
        rename = "systemInstruction",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_setting: Option<IntentionSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePair {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Messages(Vec<MessagePair>),
}

/// Caller-named intent labels. Empty or non-string values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionSetting {
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_1: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_2: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_3: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_4: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_5: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub intention_else: Option<String>,
}

impl IntentionSetting {
    /// Builds a setting from up to five numbered labels plus an optional catch-all.
    pub fn from_labels<I, S>(labels: I, catch_all: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut setting = Self {
            intention_else: catch_all.filter(|label| !label.is_empty()),
            ..Self::default()
        };
        let slots = [
            &mut setting.intention_1,
            &mut setting.intention_2,
            &mut setting.intention_3,
            &mut setting.intention_4,
            &mut setting.intention_5,
        ];
        for (slot, label) in slots.into_iter().zip(labels) {
            let label = label.into();
            if !label.is_empty() {
                *slot = Some(label);
            }
        }
        setting
    }

    pub fn numbered(&self) -> [Option<&str>; 5] {
        [
            self.intention_1.as_deref(),
            self.intention_2.as_deref(),
            self.intention_3.as_deref(),
            self.intention_4.as_deref(),
            self.intention_5.as_deref(),
        ]
    }
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(label)) if !label.is_empty() => Some(label),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionResult {
    pub intention_name: String,
    pub condition: bool,
    pub content: String,
}

/// A request that passed validation and is ready to go upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub input: ChatInput,
    pub api_key: String,
    pub system_instruction: Option<String>,
    pub temperature: f64,
    pub intention_setting: Option<IntentionSetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Upstream content payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Text(String),
    Turns(Vec<Content>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_1_result: Option<IntentionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_2_result: Option<IntentionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_3_result: Option<IntentionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_4_result: Option<IntentionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_5_result: Option<IntentionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_else_result: Option<IntentionResult>,
}

impl AiResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details,
            ..Self::default()
        }
    }

    /// Result for numbered slot `1..=5`.
    pub fn slot(&self, number: usize) -> Option<&IntentionResult> {
        match number {
            1 => self.intention_1_result.as_ref(),
            2 => self.intention_2_result.as_ref(),
            3 => self.intention_3_result.as_ref(),
            4 => self.intention_4_result.as_ref(),
            5 => self.intention_5_result.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, number: usize) -> Option<&mut Option<IntentionResult>> {
        match number {
            1 => Some(&mut self.intention_1_result),
            2 => Some(&mut self.intention_2_result),
            3 => Some(&mut self.intention_3_result),
            4 => Some(&mut self.intention_4_result),
            5 => Some(&mut self.intention_5_result),
            _ => None,
        }
    }
}
