//! OpenAI-compatible chat completion backend (Groq by default).

use super::{LlmBackend, LlmRequest};
use crate::config::{require_env, CloudLlmSettings};
use crate::error::{LingoError, Result};
use crate::models::Role;
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct CloudBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl CloudBackend {
    /// Fails with a configuration error when the API key variable is unset.
    pub fn new(settings: &CloudLlmSettings) -> Result<Self> {
        let api_key = require_env(&settings.api_key_env)?;
        let client = create_client(
            &settings.api_base,
            &api_key,
            Duration::from_secs(settings.timeout_seconds),
        )?;

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    fn messages(request: &LlmRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let build_err = |e: OpenAIError| LingoError::OpenAI(e.to_string());
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
            );
        }

        for message in &request.history {
            let message: ChatCompletionRequestMessage = match message.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
            };
            messages.push(message);
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(build_err)?
                .into(),
        );

        Ok(messages)
    }
}

#[async_trait]
impl LlmBackend for CloudBackend {
    fn name(&self) -> &str {
        "cloud"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        request.validate()?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(request)?)
            .temperature(self.temperature)
            .build()
            .map_err(|e| LingoError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(completion_error)?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LingoError::UpstreamFailure("Empty response from LLM".to_string()))?;

        debug!("Generated {} chars", answer.len());
        Ok(answer)
    }
}

fn completion_error(e: OpenAIError) -> LingoError {
    match e {
        OpenAIError::Reqwest(e) if e.is_timeout() => LingoError::UpstreamTimeout(e.to_string()),
        e => LingoError::UpstreamFailure(format!("Chat completion failed: {}", e)),
    }
}
