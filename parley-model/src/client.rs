//! Chat completion client for Azure OpenAI and OpenAI-compatible APIs.

use std::time::Duration;

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use parley_core::{BackendError, CompletionBackend, CompletionRequest, Message, Role, TextStream};
use tracing::{debug, error, info};

use crate::api::ApiClient;
use crate::config::ModelConfig;
use crate::error::ConfigError;

/// Chat completion client for Azure OpenAI deployments and OpenAI-compatible APIs.
///
/// Built on `async-openai`. Every call runs under the configured request
/// timeout; streamed calls apply it to each step of the stream.
///
/// # Example
///
/// ```rust,ignore
/// use parley_core::{ApiEndpoint, CompletionBackend, CompletionRequest, Message};
/// use parley_model::{ModelConfig, OpenAIClient};
///
/// let client = OpenAIClient::new(ModelConfig::new(ApiEndpoint::openai("sk-..."), "gpt-4o-mini"))?;
/// let reply = client.complete(CompletionRequest::new(vec![Message::user("Hello")])).await?;
/// ```
pub struct OpenAIClient {
    api: ApiClient,
    model: String,
    timeout: Duration,
}

impl OpenAIClient {
    /// Create a new client after validating the configuration.
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let api = ApiClient::new(&config.endpoint, &config.model)?;
        Ok(Self { api, model: config.model, timeout: config.request_timeout })
    }

    fn provider(&self) -> &'static str {
        self.api.provider()
    }

    fn timeout_error(&self) -> BackendError {
        BackendError::Timeout { provider: self.provider().into(), seconds: self.timeout.as_secs() }
    }

    fn build_request(
        &self,
        request: &CompletionRequest,
    ) -> parley_core::Result<CreateChatCompletionRequest> {
        let messages = request
            .messages
            .iter()
            .map(to_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.api.map_error(e))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .build()
            .map_err(|e| self.api.map_error(e))
    }
}

fn to_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.as_str();
    Ok(match message.role {
        Role::System => {
            ChatCompletionRequestSystemMessageArgs::default().content(content).build()?.into()
        }
        Role::User => {
            ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into()
        }
        Role::Assistant => {
            ChatCompletionRequestAssistantMessageArgs::default().content(content).build()?.into()
        }
    })
}

fn log_usage(provider: &str, model: &str, usage: &CompletionUsage) {
    info!(
        provider,
        model,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "token usage"
    );
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> parley_core::Result<String> {
        debug!(
            provider = self.provider(),
            model = %self.model,
            message_count = request.messages.len(),
            "chat completion"
        );

        let request = self.build_request(&request)?;
        let response = tokio::time::timeout(self.timeout, self.api.chat(request))
            .await
            .map_err(|_| {
                error!(provider = self.provider(), "request timed out");
                self.timeout_error()
            })?
            .inspect_err(|e| error!(provider = self.provider(), error = %e, "chat completion failed"))?;

        if let Some(usage) = &response.usage {
            log_usage(self.provider(), &self.model, usage);
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::EmptyResponse { provider: self.provider().into() })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> parley_core::Result<TextStream> {
        debug!(
            provider = self.provider(),
            model = %self.model,
            message_count = request.messages.len(),
            "streaming chat completion"
        );

        let request = self.build_request(&request)?;
        let mut events = self.api.chat_stream(request).await?;
        let timeout = self.timeout;
        let timeout_error = self.timeout_error();

        // The first event settles whether the request was accepted.
        let first = tokio::time::timeout(timeout, events.next())
            .await
            .map_err(|_| timeout_error.clone())?;
        let first = match first {
            Some(Err(e)) => {
                let err = self.api.map_error(e);
                error!(provider = self.provider(), error = %err, "streaming request rejected");
                return Err(err);
            }
            other => other,
        };

        let api = self.api.clone();
        let model = self.model.clone();
        let stream = try_stream! {
            let mut next = first;
            while let Some(event) = next {
                let chunk = event.map_err(|e| api.map_error(e))?;
                if let Some(usage) = &chunk.usage {
                    log_usage(api.provider(), &model, usage);
                }
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        yield content;
                    }
                }
                next = tokio::time::timeout(timeout, events.next())
                    .await
                    .map_err(|_| timeout_error.clone())?;
            }
        };

        Ok(Box::pin(stream))
    }
}
