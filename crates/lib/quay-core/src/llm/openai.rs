use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::{
    AssistantTurn,
    Completion,
    CompletionRequest,
    ConversationMessage,
    ToolInvocation,
    Usage,
    null_as_empty,
};
use super::{ChatModel, ModelError, Provider};

/// Client for any `OpenAI`-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleModel {
    /// Builds a client using the provider's default base URL and model.
    ///
    /// # Errors
    /// Returns `ModelError::Transport` if the HTTP client cannot be built.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let client = Client::builder()
            .user_agent(concat!("quay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ModelError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: api_key.into(),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body<'a>(&'a self, request: &CompletionRequest<'a>) -> RequestBody<'a> {
        let tools: Vec<WireTool<'a>> = request
            .tools
            .iter()
            .map(|descriptor| WireTool {
                kind: "function",
                function: WireFunction {
                    name: descriptor.name,
                    description: descriptor.description,
                    parameters: descriptor.parameters_schema(),
                },
            })
            .collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");
        RequestBody {
            model: &self.model,
            messages: request.messages,
            tools,
            tool_choice,
        }
    }
}

impl std::fmt::Debug for OpenAiCompatibleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleModel")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ChatModel for OpenAiCompatibleModel {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        let body = self.body(&request);
        debug!(
            provider = %self.provider,
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(status_error(status, String::from_utf8_lossy(&bytes).into_owned()));
        }

        parse_completion(&bytes)
    }

    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }
}

fn status_error(status: StatusCode, body: String) -> ModelError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited(body),
        other => ModelError::Status {
            status: other.as_u16(),
            body,
        },
    }
}

fn parse_completion(bytes: &[u8]) -> Result<Completion, ModelError> {
    let parsed: ResponseBody = serde_json::from_slice(bytes)
        .map_err(|err| ModelError::MalformedResponse(err.to_string()))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(ModelError::EmptyResponse)?;
    Ok(Completion {
        message: AssistantTurn {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
        },
        usage: parsed.usage,
    })
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    tool_calls: Vec<ToolInvocation>,
}
