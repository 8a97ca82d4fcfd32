//! Language-model seam.
//!
//! [`ChatModel`] is what the orchestrator talks to. The production
//! implementation is [`OpenAiCompatibleModel`], which speaks the
//! `chat/completions` protocol shared by `OpenAI` and `DeepSeek`.

pub mod openai;
pub mod types;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use openai::OpenAiCompatibleModel;
pub use types::{
    AssistantTurn,
    Completion,
    CompletionRequest,
    ConversationMessage,
    ToolInvocation,
    Usage,
};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model provider rejected the API key: {0}")]
    Auth(String),
    #[error("model provider rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be parsed: {0}")]
    MalformedResponse(String),
    #[error("model response contained no choices")]
    EmptyResponse,
    #[error("model did not respond within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ModelError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A chat-completion backend able to propose tool calls.
pub trait ChatModel: Send + Sync {
    fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;

    /// Provider label reported by the health endpoint and in logs.
    fn provider_name(&self) -> &str;
}

impl<T: ChatModel> ChatModel for Arc<T> {
    fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send {
        (**self).complete(request)
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    #[default]
    DeepSeek,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
            Self::DeepSeek => "DEEPSEEK",
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com",
        }
    }

    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::DeepSeek => "deepseek-chat",
        }
    }

    /// Environment variable holding this provider's API key.
    #[must_use]
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported AI provider `{0}` (expected OPENAI or DEEPSEEK)")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPENAI" => Ok(Self::OpenAi),
            "DEEPSEEK" => Ok(Self::DeepSeek),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("openai".parse::<Provider>(), Ok(Provider::OpenAi));
        assert_eq!("DEEPSEEK".parse::<Provider>(), Ok(Provider::DeepSeek));
        assert!("anthropic".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_defaults_match_endpoints() {
        assert_eq!(Provider::default(), Provider::DeepSeek);
        assert_eq!(Provider::DeepSeek.default_model(), "deepseek-chat");
        assert_eq!(Provider::OpenAi.default_base_url(), "https://api.openai.com/v1");
    }
}
