//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session instead of being sent to
//! the backend.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Discard the conversation and show the greeting again.
    New,

    /// Remove every message.
    Clear,

    /// Hide the banner on display.
    Dismiss,

    /// Report whether a token is stored.
    Token,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a question.
///
/// # Examples
///
/// ```
/// # use veritly::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/new"), Some(ChatCommand::New));
/// assert!(parse_command("Explain Rule 56 with citations.").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match (command.as_str(), argument) {
        ("new", None) => ChatCommand::New,
        ("clear", None) => ChatCommand::Clear,
        ("dismiss", None) => ChatCommand::Dismiss,
        ("token", None) => ChatCommand::Token,
        ("stats" | "status", None) => ChatCommand::Stats,
        ("help" | "?", None) => ChatCommand::Help,
        ("quit" | "exit" | "q", None) => ChatCommand::Quit,
        (
            "new" | "clear" | "dismiss" | "token" | "stats" | "status" | "help" | "?" | "quit"
            | "exit" | "q",
            Some(_),
        ) => ChatCommand::Invalid(format!("/{command} takes no arguments")),
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat (shows the greeting again)
  /clear                 Clear the conversation
  /dismiss               Hide the current error banner
  /token                 Show whether a free token is stored
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/dismiss"), Some(ChatCommand::Dismiss));
        assert_eq!(parse_command("/token"), Some(ChatCommand::Token));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn arguments_are_rejected() {
        assert_eq!(
            parse_command("/clear everything"),
            Some(ChatCommand::Invalid("/clear takes no arguments".to_string()))
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model gpt"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Summarize Roe v. Wade"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/new", "/clear", "/dismiss", "/token", "/stats", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
