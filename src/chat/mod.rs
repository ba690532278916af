//! Chat session client for the VeritlyAI backend.
//!
//! This module provides everything the terminal client needs beyond the raw
//! HTTP calls:
//!
//! - Free-token bootstrap on session start
//! - An append-only message list with "clear" and "new chat" resets
//! - Query dispatch with sequence-numbered completions
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`bootstrap`]: Obtaining and storing the free token
//! - [`dispatch`]: Sending questions and classifying responses
//! - [`session`]: The message list and how completions land in it
//! - [`commands`]: Slash command parsing

mod bootstrap;
mod commands;
mod config;
mod dispatch;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use bootstrap::{BootstrapOutcome, TokenBootstrapper};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, TOKEN_FILE_ENV};
pub use dispatch::{Completion, DispatchOutcome, NO_VALID_RESPONSE, PendingQuery, QueryDispatcher};
pub use session::{
    Applied, ChatSession, EMPTY_STATE_HINT, EMPTY_STATE_TITLE, SessionState, SessionStats,
    USAGE_SAMPLES, WELCOME,
};
