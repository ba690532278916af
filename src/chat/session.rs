//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the ordered
//! message list and applies dispatch outcomes to it.

use std::sync::Arc;

use crate::banner::{Banner, BannerBoard, BannerKind};
use crate::chat::dispatch::{Completion, DispatchOutcome, PendingQuery, QueryDispatcher};
use crate::observability::DISPATCH_STALE;
use crate::types::{Message, MessageBody, MessageId, MessageKind};

/// First greeting line of a new chat.
pub const WELCOME: &str = "Welcome to VeritlyAI. I can summarize case law, extract key facts, draft clauses, and answer questions with citations.";

/// Second greeting line of a new chat.
pub const USAGE_SAMPLES: &str = "Try a sample:
• Summarize: \"Summarize Roe v. Wade in 3 bullet points.\"
• Compare: \"Compare consideration in contracts vs. promissory estoppel.\"
• Draft: \"Draft an NDA clause for jurisdiction in Texas.\"
• Extract: \"From this paragraph, list parties and dates.\"
• Cite: \"Explain Rule 56 with citations.\"";

/// Heading shown in place of an empty conversation.
pub const EMPTY_STATE_TITLE: &str = "Start a conversation with VeritlyAI";

/// Hint shown in place of an empty conversation.
pub const EMPTY_STATE_HINT: &str =
    "Ask questions about case law, request document drafting, or get case summaries.";

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Holding only the greeting.
    New,
    /// Anything else, including an empty list after [`ChatSession::clear`].
    Active,
}

/// What applying a completion did.
#[derive(Debug, Clone)]
pub enum Applied {
    /// A bot message was appended.
    Message(MessageId),
    /// A banner went up instead.
    Banner(Banner),
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Messages currently in the conversation.
    pub message_count: usize,
    /// User messages currently in the conversation.
    pub user_messages: usize,
    /// Bot messages currently in the conversation.
    pub bot_messages: usize,
    /// Completions that appended a bot message, over the session's life.
    pub replies: u64,
    /// Completions that raised a banner, over the session's life.
    pub failures: u64,
    /// Completions applied after a later-dispatched one.
    pub stale_completions: u64,
}

/// A chat session: the message list plus the banner board it reports to.
pub struct ChatSession {
    messages: Vec<Message>,
    next_id: u64,
    state: SessionState,
    banners: Arc<BannerBoard>,
    newest_applied: Option<u64>,
    replies: u64,
    failures: u64,
    stale_completions: u64,
}

impl ChatSession {
    /// Creates a session showing the greeting.
    pub fn new() -> Self {
        Self::with_banners(Arc::new(BannerBoard::new()))
    }

    /// Creates a session that raises banners on `banners`.
    pub fn with_banners(banners: Arc<BannerBoard>) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            next_id: 0,
            state: SessionState::New,
            banners,
            newest_applied: None,
            replies: 0,
            failures: 0,
            stale_completions: 0,
        };
        session.start_new();
        session
    }

    /// Appends a message and returns its id.
    pub fn append(&mut self, kind: MessageKind, body: impl Into<MessageBody>) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages.push(Message::new(id, kind, body.into()));
        self.state = SessionState::Active;
        id
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.state = SessionState::Active;
    }

    /// Discards the conversation and shows the greeting again.
    pub fn start_new(&mut self) {
        self.messages.clear();
        self.append(MessageKind::Bot, WELCOME);
        self.append(MessageKind::Bot, USAGE_SAMPLES);
        self.state = SessionState::New;
    }

    /// Returns the messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Looks up a message by id.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages and the front end should show
    /// the empty-state placeholder.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the banner board this session reports to.
    pub fn banners(&self) -> &Arc<BannerBoard> {
        &self.banners
    }

    /// Starts a submission: clears any banner, appends the user message and
    /// returns the query to run.
    ///
    /// Returns `None`, changing nothing, when `text` is blank.
    pub fn begin(&mut self, dispatcher: &QueryDispatcher, text: &str) -> Option<PendingQuery> {
        let pending = dispatcher.prepare(text)?;
        self.banners.dismiss();
        self.append(MessageKind::User, pending.question.as_str());
        Some(pending)
    }

    /// Applies a finished dispatch: appends a bot message or raises a
    /// banner, never both.
    ///
    /// Completions are applied in the order they arrive.  One that arrives
    /// after a later-dispatched completion is still applied and counted as
    /// stale.
    pub fn apply(&mut self, completion: Completion) -> Applied {
        match self.newest_applied {
            Some(newest) if completion.seq < newest => {
                self.stale_completions += 1;
                DISPATCH_STALE.click();
            }
            _ => self.newest_applied = Some(completion.seq),
        }

        match completion.outcome {
            DispatchOutcome::Failed(err) => {
                self.failures += 1;
                Applied::Banner(self.banners.raise(BannerKind::Api, &err))
            }
            outcome => {
                self.replies += 1;
                let body = outcome.into_body().unwrap_or_default();
                Applied::Message(self.append(MessageKind::Bot, body))
            }
        }
    }

    /// Submits `text` and waits for the answer.
    ///
    /// Returns `None` for blank input.
    pub async fn submit(&mut self, dispatcher: &QueryDispatcher, text: &str) -> Option<Applied> {
        let pending = self.begin(dispatcher, text)?;
        let completion = dispatcher.run(pending).await;
        Some(self.apply(completion))
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let user_messages = self.messages.iter().filter(|m| m.is_user()).count();
        SessionStats {
            message_count: self.messages.len(),
            user_messages,
            bot_messages: self.messages.len() - user_messages,
            replies: self.replies,
            failures: self.failures,
            stale_completions: self.stale_completions,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
