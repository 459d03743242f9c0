use serde_json::Value;
use thiserror::Error;

use crate::models::{
    ChatInput, ChatRequest, Content, Contents, MessagePair, Part, ValidatedRequest,
    DEFAULT_TEMPERATURE, MAX_TEMPERATURE, MIN_TEMPERATURE,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required parameter: input or messageList")]
    MissingInput,
    #[error("Missing required parameter: apikey")]
    MissingApiKey,
    #[error("Temperature must be between 0 and 2")]
    TemperatureOutOfRange,
    #[error("Array input must contain objects with 'role' and 'content' properties")]
    MalformedMessage,
    #[error("Input must be either a string or an array of message objects")]
    UnsupportedInput,
}

/// Checks a raw request and decides the shape of its input.
///
/// Checks run in a fixed order: input presence, api key, temperature, then the
/// input shape. `input` wins over `messageList` when both are present.
pub fn validate_request(request: ChatRequest) -> Result<ValidatedRequest, ValidationError> {
    let raw_input = request
        .input
        .filter(is_present)
        .or(request.message_list.filter(is_present))
        .ok_or(ValidationError::MissingInput)?;

    let api_key = request
        .apikey
        .filter(|key| !key.is_empty())
        .ok_or(ValidationError::MissingApiKey)?;

    let temperature = request.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(ValidationError::TemperatureOutOfRange);
    }

    let input = decide_input(raw_input)?;

    Ok(ValidatedRequest {
        input,
        api_key,
        system_instruction: request.system_instruction,
        temperature,
        intention_setting: request.intention_setting,
    })
}

/// Upstream role label for a caller role.
pub fn map_role(role: &str) -> &str {
    match role {
        "assistant" => "model",
        other => other,
    }
}

pub fn normalize_contents(input: &ChatInput) -> Contents {
    match input {
        ChatInput::Text(text) => Contents::Text(text.clone()),
        ChatInput::Messages(messages) => Contents::Turns(
            messages
                .iter()
                .map(|message| Content {
                    role: map_role(&message.role).to_string(),
                    parts: vec![Part {
                        text: message.content.clone(),
                    }],
                })
                .collect(),
        ),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn decide_input(value: Value) -> Result<ChatInput, ValidationError> {
    match value {
        Value::String(text) => Ok(ChatInput::Text(text)),
        Value::Array(items) => items
            .into_iter()
            .map(message_pair)
            .collect::<Result<Vec<_>, _>>()
            .map(ChatInput::Messages),
        _ => Err(ValidationError::UnsupportedInput),
    }
}

fn message_pair(item: Value) -> Result<MessagePair, ValidationError> {
    let field = |name: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    };

    match (field("role"), field("content")) {
        (Some(role), Some(content)) => Ok(MessagePair { role, content }),
        _ => Err(ValidationError::MalformedMessage),
    }
}
