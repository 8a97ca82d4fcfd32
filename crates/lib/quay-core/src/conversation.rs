//! Two-round tool-dispatch conversation.
//!
//! A chat turn asks the model once with the chat tools offered. If it answers
//! directly that answer is final. Otherwise every proposed invocation is
//! executed in order, its result appended as a tool message, and the model is
//! asked once more with no tools offered.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{self, Surface, ToolDescriptor};
use crate::llm::{
    AssistantTurn,
    ChatModel,
    Completion,
    CompletionRequest,
    ConversationMessage,
    ModelError,
    Usage,
};
use crate::store::TerminalStore;
use crate::tools::{ToolExecutor, ToolOutcome, outcome_payload};

pub const SYSTEM_PROMPT: &str = "You are an AI assistant for APM Terminal operations. \
You help users query vessel visit data, productivity metrics, and terminal operations.

When users ask questions, use the available functions to retrieve accurate data from the \
database. Format your responses in a clear, professional manner.

For numerical data, include relevant context and units (e.g., CMPH, hours, container counts).";

const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ConversationError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Model(err) if err.is_timeout())
    }
}

/// Messages of one chat turn, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ConversationMessage>,
}

impl Transcript {
    /// Accepts client history, rejecting tool messages that answer no earlier
    /// assistant invocation.
    ///
    /// # Errors
    /// Returns `ConversationError::Validation` naming the first orphaned id.
    pub fn from_history(history: Vec<ConversationMessage>) -> Result<Self, ConversationError> {
        let mut invoked: HashSet<&str> = HashSet::new();
        for message in &history {
            match message {
                ConversationMessage::Assistant { tool_calls, .. } => {
                    invoked.extend(tool_calls.iter().map(|call| call.id.as_str()));
                }
                ConversationMessage::Tool { tool_call_id, .. }
                    if !invoked.contains(tool_call_id.as_str()) =>
                {
                    return Err(ConversationError::Validation(format!(
                        "tool message references unknown tool_call_id: {tool_call_id}"
                    )));
                }
                _ => {}
            }
        }
        Ok(Self { messages: history })
    }

    /// Prepends `prompt` unless the history already opens with a system message.
    pub fn seed(&mut self, prompt: &str) {
        if !self.messages.first().is_some_and(ConversationMessage::is_system) {
            self.messages.insert(0, ConversationMessage::system(prompt));
        }
    }

    pub fn push_assistant(&mut self, turn: AssistantTurn) {
        self.messages.push(turn.into_message());
    }

    pub fn push_tool_result(&mut self, invocation_id: &str, outcome: &ToolOutcome) {
        let content = outcome_payload(outcome).to_string();
        self.messages.push(ConversationMessage::tool(invocation_id, content));
    }

    #[must_use]
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Final answer of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub message: Option<String>,
    /// Usage of the last model call.
    pub usage: Option<Usage>,
    /// Tool names executed, in order.
    pub tools_used: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub model_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub const fn with_model_timeout(mut self, model_timeout: Duration) -> Self {
        self.model_timeout = model_timeout;
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

pub struct Orchestrator<M, S> {
    model: M,
    executor: ToolExecutor<S>,
    config: OrchestratorConfig,
    chat_tools: Vec<&'static ToolDescriptor>,
}

impl<M, S> Orchestrator<M, S>
where
    M: ChatModel,
    S: TerminalStore,
{
    pub fn new(model: M, executor: ToolExecutor<S>, config: OrchestratorConfig) -> Self {
        Self {
            model,
            executor,
            config,
            chat_tools: catalog::for_surface(Surface::Chat).collect(),
        }
    }

    pub const fn model(&self) -> &M {
        &self.model
    }

    pub const fn executor(&self) -> &ToolExecutor<S> {
        &self.executor
    }

    /// Runs one chat turn over `history`.
    ///
    /// # Errors
    /// Returns `Validation` for inconsistent history and `Model` for any model
    /// fault in either round. Tool failures never surface here; they are
    /// handed to the model as error payloads.
    pub async fn respond(
        &self,
        history: Vec<ConversationMessage>,
    ) -> Result<ChatReply, ConversationError> {
        let mut transcript = Transcript::from_history(history)?;
        transcript.seed(&self.config.system_prompt);

        let first = self.ask(&transcript, &self.chat_tools).await?;
        if first.message.tool_calls.is_empty() {
            return Ok(ChatReply {
                message: first.message.content,
                usage: first.usage,
                tools_used: Vec::new(),
            });
        }

        let invocations = first.message.tool_calls.clone();
        transcript.push_assistant(first.message);

        let mut tools_used = Vec::with_capacity(invocations.len());
        for invocation in &invocations {
            let started = Instant::now();
            let outcome = self
                .executor
                .execute_json(&invocation.name, &invocation.arguments)
                .await;
            info!(
                tool = %invocation.name,
                invocation_id = %invocation.id,
                ok = outcome.is_ok(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "tool invocation finished"
            );
            transcript.push_tool_result(&invocation.id, &outcome);
            tools_used.push(invocation.name.clone());
        }

        let second = self.ask(&transcript, &[]).await?;
        if !second.message.tool_calls.is_empty() {
            warn!(
                ignored = second.message.tool_calls.len(),
                "model proposed tool calls in the follow-up round; returning its content"
            );
        }

        Ok(ChatReply {
            message: second.message.content,
            usage: second.usage,
            tools_used,
        })
    }

    async fn ask(
        &self,
        transcript: &Transcript,
        tools: &[&'static ToolDescriptor],
    ) -> Result<Completion, ModelError> {
        let request = CompletionRequest {
            messages: transcript.messages(),
            tools,
        };
        debug!(
            provider = self.model.provider_name(),
            messages = transcript.len(),
            tools = tools.len(),
            "calling model"
        );
        tokio::time::timeout(self.config.model_timeout, self.model.complete(request))
            .await
            .map_err(|_| ModelError::Timeout(self.config.model_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolInvocation;

    #[test]
    fn seed_prepends_prompt_once() {
        let mut transcript =
            Transcript::from_history(vec![ConversationMessage::user("hi")]).expect("history");
        transcript.seed("prompt");
        transcript.seed("prompt");

        assert_eq!(
            transcript.messages(),
            &[
                ConversationMessage::system("prompt"),
                ConversationMessage::user("hi")
            ]
        );
    }

    #[test]
    fn client_system_message_is_kept() {
        let mut transcript = Transcript::from_history(vec![
            ConversationMessage::system("custom"),
            ConversationMessage::user("hi"),
        ])
        .expect("history");
        transcript.seed(SYSTEM_PROMPT);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0], ConversationMessage::system("custom"));
    }

    #[test]
    fn orphaned_tool_message_is_rejected() {
        let err = Transcript::from_history(vec![
            ConversationMessage::user("hi"),
            ConversationMessage::tool("call_7", "[]"),
        ])
        .expect_err("orphan");

        assert!(matches!(err, ConversationError::Validation(_)));
        assert!(err.to_string().contains("call_7"));
    }

    #[test]
    fn correlated_tool_message_is_accepted() {
        let history = vec![
            ConversationMessage::user("hi"),
            AssistantTurn::calls(vec![ToolInvocation::new("call_1", "get_visits_today", "{}")])
                .into_message(),
            ConversationMessage::tool("call_1", "[]"),
        ];
        assert!(Transcript::from_history(history).is_ok());
    }

    #[test]
    fn timeout_is_detected_through_wrapper() {
        let err = ConversationError::from(ModelError::Timeout(Duration::from_secs(1)));
        assert!(err.is_timeout());
        assert!(!ConversationError::Validation("x".into()).is_timeout());
    }
}
