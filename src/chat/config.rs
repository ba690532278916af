//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for the terminal client.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{BASE_URL_ENV, DEFAULT_BASE_URL};

/// Environment variable consulted for the token file.
pub const TOKEN_FILE_ENV: &str = "VERITLY_TOKEN_FILE";

/// Token file used when `$HOME` is not set.
const FALLBACK_TOKEN_FILE: &str = ".veritly_state.json";

/// Command-line arguments for the veritly-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the VeritlyAI backend.
    #[arrrg(optional, "Backend base URL (default: http://localhost:8082/)", "URL")]
    pub base_url: Option<String>,

    /// Where the free token is persisted.
    #[arrrg(optional, "File the free token is stored in", "PATH")]
    pub token_file: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log every backend exchange to stderr.
    #[arrrg(flag, "Log backend exchanges to stderr")]
    pub verbose: bool,
}

/// Configuration for the chat client.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the backend.
    pub base_url: String,

    /// File the free token is stored in.
    pub token_file: PathBuf,

    /// Request timeout.  `None` leaves requests unbounded.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log every backend exchange.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: http://localhost:8082/
    /// - Token file: .veritly_state.json
    /// - Timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: PathBuf::from(FALLBACK_TOKEN_FILE),
            timeout: None,
            use_color: true,
            verbose: false,
        }
    }

    /// Resolves arguments, consulting `env` for anything not given.
    ///
    /// Precedence: flag, then environment variable, then default.  The
    /// default token file lives under `$HOME/.veritly/`.
    pub fn resolve<F>(args: ChatArgs, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = args
            .base_url
            .or_else(|| env(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token_file = args
            .token_file
            .or_else(|| env(TOKEN_FILE_ENV))
            .map(PathBuf::from)
            .unwrap_or_else(|| default_token_file(env("HOME")));
        ChatConfig {
            base_url,
            token_file,
            timeout: args.timeout_secs.map(Duration::from_secs),
            use_color: !args.no_color,
            verbose: args.verbose,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the token file.
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables verbose logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig::resolve(args, |key| std::env::var(key).ok())
    }
}

fn default_token_file(home: Option<String>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".veritly").join("state.json"),
        None => PathBuf::from(FALLBACK_TOKEN_FILE),
    }
}
