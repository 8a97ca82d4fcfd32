//! In-memory fakes for the store and model seams.
//!
//! Enabled for this crate's tests and, through the `testing` feature, for the
//! adapter crates' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use quay_store::{Query, Row, SqlParam};

use crate::llm::{
    AssistantTurn,
    ChatModel,
    Completion,
    CompletionRequest,
    ConversationMessage,
    ModelError,
    ToolInvocation,
    Usage,
};
use crate::store::{StoreError, StoreResult, TerminalStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub type StoreCall = (Query, Vec<SqlParam>);

/// Store returning canned rows per statement and recording every call.
///
/// Statements without canned rows return no rows. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    rows: Arc<Mutex<HashMap<Query, Vec<Row>>>>,
    failures: Arc<Mutex<HashMap<Query, String>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl StaticStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rows(self, query: Query, rows: Vec<Row>) -> Self {
        lock(&self.rows).insert(query, rows);
        self
    }

    /// Makes `query` fail with `StoreError::Query(message)`.
    #[must_use]
    pub fn with_failure(self, query: Query, message: impl Into<String>) -> Self {
        lock(&self.failures).insert(query, message.into());
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }
}

impl TerminalStore for StaticStore {
    async fn fetch(&self, query: Query, params: Vec<SqlParam>) -> StoreResult<Vec<Row>> {
        lock(&self.calls).push((query, params));
        if let Some(message) = lock(&self.failures).get(&query) {
            return Err(StoreError::Query(message.clone()));
        }
        Ok(lock(&self.rows).get(&query).cloned().unwrap_or_default())
    }
}

/// What a [`ScriptedModel`] was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub messages: Vec<ConversationMessage>,
    pub tools: Vec<&'static str>,
}

/// Model replaying queued completions in order.
///
/// Once the script is exhausted every call fails with `EmptyResponse`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<Result<Completion, ModelError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a plain text answer.
    #[must_use]
    pub fn answer(self, content: &str) -> Self {
        self.then(Ok(Completion {
            message: AssistantTurn::text(content),
            usage: Some(usage(10)),
        }))
    }

    /// Queues a turn proposing `calls` as `(id, tool, arguments)` triples.
    #[must_use]
    pub fn invoke(self, calls: &[(&str, &str, &str)]) -> Self {
        let calls = calls
            .iter()
            .map(|(id, name, arguments)| ToolInvocation::new(*id, *name, *arguments))
            .collect();
        self.then(Ok(Completion {
            message: AssistantTurn::calls(calls),
            usage: Some(usage(5)),
        }))
    }

    #[must_use]
    pub fn fail(self, error: ModelError) -> Self {
        self.then(Err(error))
    }

    #[must_use]
    pub fn then(self, completion: Result<Completion, ModelError>) -> Self {
        lock(&self.script).push_back(completion);
        self
    }

    /// Delays every response by `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

/// Usage with `total` tokens split evenly.
#[must_use]
pub const fn usage(total: u64) -> Usage {
    Usage {
        prompt_tokens: total / 2,
        completion_tokens: total - total / 2,
        total_tokens: total,
    }
}

impl ChatModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        lock(&self.requests).push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|descriptor| descriptor.name).collect(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.script)
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse))
    }

    fn provider_name(&self) -> &str {
        "SCRIPTED"
    }
}
