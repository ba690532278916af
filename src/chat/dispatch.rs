//! Query dispatch.
//!
//! [`QueryDispatcher`] turns a question into exactly one [`DispatchOutcome`].
//! It never touches the message list; [`ChatSession::apply`] does that, so
//! several dispatches can be in flight while the session stays single-owner.
//!
//! [`ChatSession::apply`]: crate::chat::ChatSession::apply

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::Error;
use crate::client::RagBackend;
use crate::client_logger::{ClientLogger, Operation};
use crate::observability::{
    DISPATCH_EMPTY_RESPONSES, DISPATCH_FAILURES, DISPATCH_IGNORED_EMPTY, DISPATCH_REPLIES,
    DISPATCH_SENT,
};
use crate::token_store::TokenStore;
use crate::types::{MessageBody, QueryResult};

/// Bot text for a well-formed response that carries no answer.
pub const NO_VALID_RESPONSE: &str = "No valid response received from API";

/// A question accepted for dispatch, stamped with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    /// Increases by one with every accepted question.
    pub seq: u64,
    /// The trimmed question.
    pub question: String,
}

/// What a dispatch produced.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The backend answered.
    Reply(MessageBody),
    /// The backend answered 2xx without a usable answer.
    EmptyResponse,
    /// Transport failure, non-2xx status, or an unparsable body.
    Failed(Error),
}

impl DispatchOutcome {
    /// Classifies a parsed 2xx query response.
    pub fn from_result(result: &QueryResult) -> Self {
        match result.reply() {
            Some(body) => DispatchOutcome::Reply(body),
            None => DispatchOutcome::EmptyResponse,
        }
    }

    /// Returns the bot message this outcome appends, if any.
    pub fn into_body(self) -> Option<MessageBody> {
        match self {
            DispatchOutcome::Reply(body) => Some(body),
            DispatchOutcome::EmptyResponse => Some(MessageBody::text(NO_VALID_RESPONSE)),
            DispatchOutcome::Failed(_) => None,
        }
    }
}

/// A finished dispatch.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Sequence number of the [`PendingQuery`] this completes.
    pub seq: u64,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// Sends questions to the query endpoint.
pub struct QueryDispatcher {
    backend: Arc<dyn RagBackend>,
    store: Arc<dyn TokenStore>,
    logger: Option<Arc<dyn ClientLogger>>,
    next_seq: AtomicU64,
}

impl QueryDispatcher {
    /// Creates a new QueryDispatcher.
    pub fn new(backend: Arc<dyn RagBackend>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            store,
            logger: None,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Installs a logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Accepts a question for dispatch.
    ///
    /// Returns `None` for a question that is empty after trimming; nothing is
    /// sent for it and no sequence number is consumed.
    pub fn prepare(&self, question: &str) -> Option<PendingQuery> {
        let question = question.trim();
        if question.is_empty() {
            DISPATCH_IGNORED_EMPTY.click();
            return None;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        Some(PendingQuery {
            seq,
            question: question.to_string(),
        })
    }

    /// Sends a prepared question.
    ///
    /// The token is read when the request goes out, so a token stored by a
    /// bootstrap that finished meanwhile is picked up.
    pub async fn run(&self, pending: PendingQuery) -> Completion {
        DISPATCH_SENT.click();
        let token = self.store.get();
        let outcome = match self.backend.query(&pending.question, token.as_deref()).await {
            Ok(result) => {
                if let Some(logger) = &self.logger {
                    logger.log_query_result(pending.seq, &result);
                }
                DispatchOutcome::from_result(&result)
            }
            Err(err) => {
                if let Some(logger) = &self.logger {
                    logger.log_error(Operation::Query, Some(pending.seq), &err);
                }
                DispatchOutcome::Failed(err)
            }
        };
        match &outcome {
            DispatchOutcome::Reply(_) => DISPATCH_REPLIES.click(),
            DispatchOutcome::EmptyResponse => DISPATCH_EMPTY_RESPONSES.click(),
            DispatchOutcome::Failed(_) => DISPATCH_FAILURES.click(),
        }
        Completion {
            seq: pending.seq,
            outcome,
        }
    }

    /// Runs a prepared question on its own task, delivering the completion
    /// to `done`.
    ///
    /// The caller keeps reading input while the request is out; completions
    /// arrive in the order the backend answers.
    pub fn spawn(
        self: &Arc<Self>,
        pending: PendingQuery,
        done: UnboundedSender<Completion>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let completion = dispatcher.run(pending).await;
            // The receiver is gone only when the front end is shutting down.
            let _ = done.send(completion);
        })
    }

    /// Prepares and runs a question in one step.
    pub async fn send(&self, question: &str) -> Option<Completion> {
        let pending = self.prepare(question)?;
        Some(self.run(pending).await)
    }

    /// Returns how many questions have been accepted.
    pub fn dispatched(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    /// Returns true if a token is stored for outgoing queries.
    pub fn has_token(&self) -> bool {
        self.store.has()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::ScriptedBackend;
    use crate::token_store::MemoryTokenStore;
    use crate::types::Source;

    fn dispatcher(backend: Arc<ScriptedBackend>, token: Option<&str>) -> QueryDispatcher {
        let store = match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        };
        QueryDispatcher::new(backend, Arc::new(store))
    }

    #[tokio::test]
    async fn blank_questions_are_ignored() {
        let backend = Arc::new(ScriptedBackend::new());
        let dispatcher = dispatcher(backend.clone(), None);

        assert!(dispatcher.send("").await.is_none());
        assert!(dispatcher.send("   ").await.is_none());
        assert!(dispatcher.send("\n\t").await.is_none());
        assert_eq!(backend.queries().len(), 0);
        assert_eq!(dispatcher.dispatched(), 0);
    }

    #[tokio::test]
    async fn question_is_trimmed_and_token_attached() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_answer("A", vec![]);
        let dispatcher = dispatcher(backend.clone(), Some("tok"));

        dispatcher.send("  What is Rule 56?  ").await.unwrap();
        assert_eq!(
            backend.queries(),
            vec![("What is Rule 56?".to_string(), Some("tok".to_string()))]
        );
    }

    #[tokio::test]
    async fn no_token_sends_without_authorization() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_answer("A", vec![]);
        let dispatcher = dispatcher(backend.clone(), None);

        dispatcher.send("hello").await.unwrap();
        assert_eq!(backend.queries(), vec![("hello".to_string(), None)]);
    }

    #[tokio::test]
    async fn reply_with_sources() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_answer("A", vec![Source::new(1, "doc.pdf", "text")]);
        let dispatcher = dispatcher(backend, None);

        let completion = dispatcher.send("q").await.unwrap();
        assert_eq!(completion.seq, 1);
        let body = completion.outcome.into_body().unwrap();
        let text = body.plain_text();
        assert!(text.contains("Sources (1):"));
        assert!(text.contains("Rank 1 - doc.pdf: text"));
    }

    #[tokio::test]
    async fn unsuccessful_status_is_empty_response() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_result(QueryResult {
            status: Some("error".to_string()),
            response: None,
        });
        let dispatcher = dispatcher(backend, None);

        let completion = dispatcher.send("q").await.unwrap();
        assert!(matches!(completion.outcome, DispatchOutcome::EmptyResponse));
        assert_eq!(
            completion.outcome.into_body().unwrap().plain_text(),
            NO_VALID_RESPONSE
        );
    }

    #[tokio::test]
    async fn failure_produces_no_body() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_error(Error::api(500, "boom"));
        let dispatcher = dispatcher(backend, None);

        let completion = dispatcher.send("q").await.unwrap();
        match &completion.outcome {
            DispatchOutcome::Failed(err) => assert_eq!(err.status_code(), Some(500)),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(completion.outcome.into_body().is_none());
    }

    #[tokio::test]
    async fn sequence_numbers_increase() {
        let backend = Arc::new(ScriptedBackend::new());
        let dispatcher = dispatcher(backend, None);

        let first = dispatcher.prepare("one").unwrap();
        assert!(dispatcher.prepare(" ").is_none());
        let second = dispatcher.prepare("two").unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(dispatcher.dispatched(), 2);
    }
}
