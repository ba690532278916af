//! Logging trait for Veritly client operations.
//!
//! This module provides the [`ClientLogger`] trait that lets callers record
//! the token exchange, every query result, and every failure that the chat
//! front end turns into a banner.

use std::fmt;

use crate::Error;
use crate::types::QueryResult;

/// The operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetching or storing the free token.
    TokenBootstrap,
    /// Sending a question to the query endpoint.
    Query,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::TokenBootstrap => write!(f, "token bootstrap"),
            Operation::Query => write!(f, "query"),
        }
    }
}

/// A trait for logging Veritly client operations.
///
/// # Example
///
/// ```rust,ignore
/// use veritly::{ClientLogger, Error, Operation, QueryResult};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_token_present(&self) {}
///
///     fn log_token_acquired(&self) {
///         writeln!(self.file.lock().unwrap(), "free token stored").unwrap();
///     }
///
///     fn log_query_result(&self, seq: u64, result: &QueryResult) {
///         let json = serde_json::to_string(result).unwrap();
///         writeln!(self.file.lock().unwrap(), "#{seq}: {json}").unwrap();
///     }
///
///     fn log_error(&self, operation: Operation, seq: Option<u64>, error: &Error) {
///         writeln!(self.file.lock().unwrap(), "{operation} failed: {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Called when bootstrap finds a token already stored.
    fn log_token_present(&self);

    /// Called when bootstrap obtained and stored a fresh token.
    fn log_token_acquired(&self);

    /// Called with every parsed 2xx query response, whether or not it
    /// carried a usable answer.
    fn log_query_result(&self, seq: u64, result: &QueryResult);

    /// Called for every failure.  `seq` is the dispatch sequence number for
    /// query failures.
    fn log_error(&self, operation: Operation, seq: Option<u64>, error: &Error);
}

/// Writes log lines to stderr.
///
/// Failures are always written; the rest only when `verbose` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrLogger {
    verbose: bool,
}

impl StderrLogger {
    /// Creates a new StderrLogger.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ClientLogger for StderrLogger {
    fn log_token_present(&self) {
        if self.verbose {
            eprintln!("[veritly] free token already stored");
        }
    }

    fn log_token_acquired(&self) {
        if self.verbose {
            eprintln!("[veritly] free token saved");
        }
    }

    fn log_query_result(&self, seq: u64, result: &QueryResult) {
        if self.verbose {
            let status = result.status.as_deref().unwrap_or("(none)");
            let sources = result
                .response
                .as_ref()
                .map(|r| r.sources().len())
                .unwrap_or(0);
            eprintln!("[veritly] query #{seq}: status={status} sources={sources}");
        }
    }

    fn log_error(&self, operation: Operation, seq: Option<u64>, error: &Error) {
        match seq {
            Some(seq) => eprintln!("[veritly] {operation} #{seq} failed: {error}"),
            None => eprintln!("[veritly] {operation} failed: {error}"),
        }
    }
}
