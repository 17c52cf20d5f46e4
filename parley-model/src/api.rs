//! async-openai clients for each API flavor, with errors mapped to [`BackendError`].

use std::time::Duration;

use async_openai::Client;
use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionResponseStream, CreateChatCompletionRequest, CreateChatCompletionResponse,
    CreateEmbeddingRequest, CreateEmbeddingResponse,
};
use backoff::ExponentialBackoffBuilder;
use parley_core::{ApiEndpoint, ApiFlavor, BackendError};

use crate::error::ConfigError;

/// Connection establishment deadline, independent of the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
enum Flavored {
    OpenAI(Client<OpenAIConfig>),
    Azure(Client<AzureConfig>),
}

/// An async-openai client bound to one endpoint and one model.
///
/// On Azure the model is the deployment, which is part of every URL, so a
/// chat deployment and an embedding deployment need one client each.
/// async-openai's own rate-limit backoff is switched off: callers retry with a
/// [`RetryPolicy`](parley_core::RetryPolicy) instead.
#[derive(Clone)]
pub struct ApiClient {
    inner: Flavored,
    provider: &'static str,
}

impl ApiClient {
    pub fn new(endpoint: &ApiEndpoint, model: &str) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        let no_retry =
            ExponentialBackoffBuilder::new().with_max_elapsed_time(Some(Duration::ZERO)).build();

        let inner = match &endpoint.flavor {
            ApiFlavor::OpenAI => {
                let config = OpenAIConfig::new()
                    .with_api_key(endpoint.api_key.as_str())
                    .with_api_base(endpoint.base());
                Flavored::OpenAI(
                    Client::with_config(config).with_http_client(http).with_backoff(no_retry),
                )
            }
            ApiFlavor::Azure { api_version } => {
                let config = AzureConfig::new()
                    .with_api_base(endpoint.base())
                    .with_api_version(api_version.as_str())
                    .with_deployment_id(model)
                    .with_api_key(endpoint.api_key.as_str());
                Flavored::Azure(
                    Client::with_config(config).with_http_client(http).with_backoff(no_retry),
                )
            }
        };

        Ok(Self { inner, provider: endpoint.provider_name() })
    }

    /// Name used in logs and errors.
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub async fn chat(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, BackendError> {
        let result = match &self.inner {
            Flavored::OpenAI(client) => client.chat().create(request).await,
            Flavored::Azure(client) => client.chat().create(request).await,
        };
        result.map_err(|e| self.map_error(e))
    }

    /// Open a streamed chat completion.
    ///
    /// The HTTP exchange starts lazily: rejections such as a bad key arrive as
    /// the first item of the returned stream.
    pub async fn chat_stream(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<ChatCompletionResponseStream, BackendError> {
        let result = match &self.inner {
            Flavored::OpenAI(client) => client.chat().create_stream(request).await,
            Flavored::Azure(client) => client.chat().create_stream(request).await,
        };
        result.map_err(|e| self.map_error(e))
    }

    pub async fn embeddings(
        &self,
        request: CreateEmbeddingRequest,
    ) -> Result<CreateEmbeddingResponse, BackendError> {
        let result = match &self.inner {
            Flavored::OpenAI(client) => client.embeddings().create(request).await,
            Flavored::Azure(client) => client.embeddings().create(request).await,
        };
        result.map_err(|e| self.map_error(e))
    }

    /// Translate an async-openai failure into a [`BackendError`].
    pub fn map_error(&self, err: OpenAIError) -> BackendError {
        let provider = self.provider.to_string();
        match err {
            OpenAIError::ApiError(api) => {
                BackendError::Api { provider, code: api.code.or(api.r#type), message: api.message }
            }
            OpenAIError::Reqwest(e) => BackendError::Transport { provider, message: e.to_string() },
            OpenAIError::JSONDeserialize(e) => {
                BackendError::Decode { provider, message: e.to_string() }
            }
            OpenAIError::StreamError(message) => match status_in(&message) {
                Some(status) => BackendError::Status { provider, status, message },
                None => BackendError::Transport { provider, message },
            },
            OpenAIError::InvalidArgument(message) => {
                BackendError::Api { provider, code: None, message }
            }
            other => BackendError::Transport { provider, message: other.to_string() },
        }
    }
}

/// The HTTP status named by an event-stream failure such as
/// `Invalid status code: 401 Unauthorized`.
fn status_in(message: &str) -> Option<u16> {
    let (_, rest) = message.split_once("status code: ")?;
    rest.split_whitespace().next()?.parse().ok()
}
