use std::sync::Arc;
use std::time::Instant;

use gateway_core::{
    compose_intent_instruction, intention_response_schema, normalize_contents,
    reconcile_intentions, validate_request, AiResponse, ChatRequest, Contents, IntentLabels,
    IntentionSetting, UpstreamParseError, ValidatedRequest, ValidationError,
};
use gateway_observability::AppMetrics;
use gateway_upstream::{ContentGenerator, GenerateRequest, GenerationConfig, DEFAULT_GEMINI_MODEL};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an efficient assistant who thinks through the user's problem step by step. You usually answer in Chinese.";

pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse JSON response";
pub const INTERNAL_FAILURE_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to parse JSON response: {0}")]
    UpstreamParse(#[from] UpstreamParseError),
    #[error("Internal server error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    /// Structured failure body returned to the caller.
    pub fn into_response(self) -> AiResponse {
        match self {
            ChatError::Validation(err) => AiResponse::failure(err.to_string(), None),
            ChatError::UpstreamParse(err) => {
                AiResponse::failure(PARSE_FAILURE_MESSAGE, Some(err.to_string()))
            }
            ChatError::Internal(err) => {
                AiResponse::failure(INTERNAL_FAILURE_MESSAGE, Some(format!("{err:#}")))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub default_system_instruction: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            default_system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ChatAgent<G>
where
    G: ContentGenerator,
{
    generator: Arc<G>,
    settings: AgentSettings,
    metrics: Arc<AppMetrics>,
}

impl<G> ChatAgent<G>
where
    G: ContentGenerator,
{
    pub fn new(generator: Arc<G>, settings: AgentSettings, metrics: Arc<AppMetrics>) -> Self {
        Self {
            generator,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Handles one request and never fails: errors become failure responses.
    #[instrument(skip_all)]
    pub async fn respond(&self, request: ChatRequest) -> AiResponse {
        let started = Instant::now();
        self.metrics.inc_request();

        let response = match self.handle(request).await {
            Ok(response) => response,
            Err(err) => {
                self.record_failure(&err);
                err.into_response()
            }
        };

        self.metrics.observe_latency(started.elapsed());
        response
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<AiResponse, ChatError> {
        let validated = validate_request(request)?;
        let contents = normalize_contents(&validated.input);

        match validated.intention_setting.as_ref() {
            Some(setting) => self.classify(&validated, setting, contents).await,
            None => self.chat(&validated, contents).await,
        }
    }

    async fn chat(
        &self,
        request: &ValidatedRequest,
        contents: Contents,
    ) -> Result<AiResponse, ChatError> {
        let system_instruction = request
            .system_instruction
            .clone()
            .filter(|instruction| !instruction.is_empty())
            .unwrap_or_else(|| self.settings.default_system_instruction.clone());

        let text = self
            .generate(request, contents, system_instruction, None)
            .await?;

        info!(mode = "chat", chars = text.len(), "chat handled");
        Ok(AiResponse::success(text))
    }

    async fn classify(
        &self,
        request: &ValidatedRequest,
        setting: &IntentionSetting,
        contents: Contents,
    ) -> Result<AiResponse, ChatError> {
        self.metrics.inc_intent_request();

        let labels = IntentLabels::collect(setting);
        let instruction = compose_intent_instruction(&labels);

        let text = self
            .generate(
                request,
                contents,
                instruction,
                Some(intention_response_schema()),
            )
            .await?;

        let reconciled = reconcile_intentions(&labels, &text)?;
        let matched = reconciled
            .numbered
            .iter()
            .chain(std::iter::once(&reconciled.catch_all))
            .filter(|result| result.condition)
            .count();

        info!(
            mode = "intent",
            labels = labels.label_count(),
            matched,
            "chat handled"
        );
        Ok(reconciled.into_response(text))
    }

    async fn generate(
        &self,
        request: &ValidatedRequest,
        contents: Contents,
        system_instruction: String,
        response_schema: Option<serde_json::Value>,
    ) -> anyhow::Result<String> {
        let call = GenerateRequest {
            model: self.settings.model.clone(),
            api_key: request.api_key.clone(),
            contents,
            config: GenerationConfig {
                system_instruction,
                temperature: request.temperature,
                response_schema,
            },
        };

        self.generator.generate(&call).await
    }

    fn record_failure(&self, err: &ChatError) {
        match err {
            ChatError::Validation(reason) => {
                self.metrics.inc_validation_failure();
                info!(reason = %reason, "request rejected");
            }
            ChatError::UpstreamParse(reason) => {
                self.metrics.inc_parse_failure();
                warn!(reason = %reason, "upstream answer was not valid intention JSON");
            }
            ChatError::Internal(reason) => {
                self.metrics.inc_upstream_failure();
                error!(reason = %format!("{reason:#}"), "error processing AI request");
            }
        }
    }
}
