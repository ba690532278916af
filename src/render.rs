//! Output rendering for the chat client.
//!
//! Messages carry structured bodies; this module decides how they look on a
//! terminal.

use std::io::{self, Stdout, Write};

use time::macros::format_description;

use crate::banner::Banner;
use crate::chat::{EMPTY_STATE_HINT, EMPTY_STATE_TITLE};
use crate::types::{Message, MessageKind};

/// ANSI escape code for bold text (used for speaker labels and headers).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for timestamps and excerpts).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for banners).
const ANSI_RED: &str = "\x1b[31m";

/// Name shown for bot messages.
const BOT_LABEL: &str = "VeritlyAI";

/// Name shown for user messages.
const USER_LABEL: &str = "You";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one message with its citations.
    fn print_message(&mut self, message: &Message);

    /// Print a transient error banner.
    fn print_banner(&mut self, banner: &Banner);

    /// Print the placeholder for an empty conversation.
    fn print_empty_state(&mut self);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Returns true once the output has gone away, e.g. a closed pipe.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    closed: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            closed: false,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(err) = result
            && err.kind() == io::ErrorKind::BrokenPipe
        {
            self.closed = true;
        }
    }

    fn style(&self, code: &'static str) -> &'static str {
        if self.use_color { code } else { "" }
    }

    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        let (label, label_style) = match message.kind {
            MessageKind::Bot => (BOT_LABEL, self.style(ANSI_CYAN)),
            MessageKind::User => (USER_LABEL, ""),
        };
        let bold = self.style(ANSI_BOLD);
        let dim = self.style(ANSI_DIM);
        let reset = self.style(ANSI_RESET);

        let stamp = message
            .created_at
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_default();
        writeln!(
            self.out,
            "{dim}[{stamp}]{reset} {bold}{label_style}{label}:{reset}"
        )?;
        for line in message.body.text.lines() {
            writeln!(self.out, "  {line}")?;
        }
        if let Some(header) = message.body.sources_header() {
            writeln!(self.out)?;
            writeln!(self.out, "  {bold}{header}{reset}")?;
            for citation in &message.body.citations {
                writeln!(
                    self.out,
                    "    {bold}Rank {} - {}:{reset} {dim}{}{reset}",
                    citation.rank, citation.filename, citation.excerpt
                )?;
            }
        }
        if message.kind == MessageKind::User {
            writeln!(self.out, "{dim}{}{reset}", "-".repeat(40))?;
        } else {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn write_banner(&mut self, banner: &Banner) -> io::Result<()> {
        let red = self.style(ANSI_RED);
        let reset = self.style(ANSI_RESET);
        writeln!(self.out, "{red}⚠ {}{reset} (/dismiss to hide)", banner.text)?;
        self.out.flush()
    }

    fn write_empty_state(&mut self) -> io::Result<()> {
        let bold = self.style(ANSI_BOLD);
        let dim = self.style(ANSI_DIM);
        let reset = self.style(ANSI_RESET);
        writeln!(self.out, "{bold}{EMPTY_STATE_TITLE}{reset}")?;
        writeln!(self.out, "{dim}{EMPTY_STATE_HINT}{reset}")?;
        self.out.flush()
    }

    fn write_info(&mut self, info: &str) -> io::Result<()> {
        writeln!(self.out, "{info}")?;
        self.out.flush()
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_message(&mut self, message: &Message) {
        let result = self.write_message(message);
        self.record(result);
    }

    fn print_banner(&mut self, banner: &Banner) {
        let result = self.write_banner(banner);
        self.record(result);
    }

    fn print_empty_state(&mut self) {
        let result = self.write_empty_state();
        self.record(result);
    }

    fn print_info(&mut self, info: &str) {
        let result = self.write_info(info);
        self.record(result);
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("\nError: {error}");
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::{BannerBoard, BannerKind};
    use crate::types::{Citation, MessageBody, MessageId, Source};

    fn render(message: &Message) -> String {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_message(message);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn bot_message_with_citations() {
        let body = MessageBody::with_citations(
            "Line one\nLine two",
            vec![Citation::from_source(&Source::new(1, "doc.pdf", "text"))],
        );
        let out = render(&Message::new(MessageId(7), MessageKind::Bot, body));
        assert!(out.contains("VeritlyAI:"));
        assert!(out.contains("  Line one\n  Line two\n"));
        assert!(out.contains("Sources (1):"));
        assert!(out.contains("Rank 1 - doc.pdf: text"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn user_message_has_divider() {
        let out = render(&Message::new(
            MessageId(1),
            MessageKind::User,
            MessageBody::text("hi"),
        ));
        assert!(out.contains("You:"));
        assert!(out.contains(&"-".repeat(40)));
        assert!(!out.contains("Sources"));
    }

    #[tokio::test]
    async fn banner_and_empty_state() {
        let board = BannerBoard::new();
        let banner = board.raise(BannerKind::Api, &crate::Error::api(500, ""));
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.print_banner(&banner);
        renderer.print_empty_state();
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("Sorry, something went wrong. Please try again."));
        assert!(out.contains(EMPTY_STATE_TITLE));
        assert!(out.contains(ANSI_RED));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_pipe_closes_renderer() {
        let mut renderer = PlainTextRenderer::with_writer(ClosedPipe, false);
        assert!(!renderer.is_closed());
        renderer.print_info("hello");
        assert!(renderer.is_closed());
    }

    #[test]
    fn working_writer_stays_open() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_empty_state();
        renderer.print_info("hello");
        assert!(!renderer.is_closed());
    }
}
