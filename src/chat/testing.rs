//! Scripted backend for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::client::RagBackend;
use crate::error::{Error, Result};
use crate::types::{FreeToken, QueryResponse, QueryResult, Source};

type Scripted<T> = (Option<Duration>, Result<T>);

/// Replays queued responses in call order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    tokens: Mutex<VecDeque<Result<FreeToken>>>,
    answers: Mutex<VecDeque<Scripted<QueryResult>>>,
    token_requests: Mutex<usize>,
    queries: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_token(&self, token: Result<FreeToken>) {
        self.tokens.lock().unwrap().push_back(token);
    }

    pub(crate) fn push_result(&self, result: QueryResult) {
        self.answers.lock().unwrap().push_back((None, Ok(result)));
    }

    pub(crate) fn push_answer(&self, answer: &str, sources: Vec<Source>) {
        self.push_result(success(answer, sources));
    }

    pub(crate) fn push_delayed_answer(&self, delay: Duration, answer: &str) {
        self.answers
            .lock()
            .unwrap()
            .push_back((Some(delay), Ok(success(answer, vec![]))));
    }

    pub(crate) fn push_error(&self, error: Error) {
        self.answers.lock().unwrap().push_back((None, Err(error)));
    }

    pub(crate) fn token_requests(&self) -> usize {
        *self.token_requests.lock().unwrap()
    }

    pub(crate) fn queries(&self) -> Vec<(String, Option<String>)> {
        self.queries.lock().unwrap().clone()
    }
}

pub(crate) fn success(answer: &str, sources: Vec<Source>) -> QueryResult {
    QueryResult {
        status: Some("success".to_string()),
        response: Some(QueryResponse {
            answer: Some(answer.to_string()),
            sources: Some(sources),
            metadata: serde_json::Value::Null,
        }),
    }
}

#[async_trait::async_trait]
impl RagBackend for ScriptedBackend {
    async fn free_token(&self) -> Result<FreeToken> {
        *self.token_requests.lock().unwrap() += 1;
        let next = self.tokens.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::connection("no scripted token", None)))
    }

    async fn query(&self, question: &str, token: Option<&str>) -> Result<QueryResult> {
        self.queries
            .lock()
            .unwrap()
            .push((question.to_string(), token.map(String::from)));
        let next = self.answers.lock().unwrap().pop_front();
        let (delay, result) =
            next.unwrap_or_else(|| (None, Err(Error::connection("no scripted answer", None))));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
