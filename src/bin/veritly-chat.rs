//! Interactive terminal client for the VeritlyAI legal assistant.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost:8082
//! veritly-chat
//!
//! # Point at another backend and keep the token elsewhere
//! veritly-chat --base-url https://veritly.example/ --token-file ~/.veritly/work.json
//!
//! # Disable colors and log every backend exchange
//! veritly-chat --no-color --verbose
//! ```
//!
//! # Commands
//!
//! - `/new` - Start a new chat
//! - `/clear` - Clear the conversation
//! - `/dismiss` - Hide the current error banner
//! - `/token` - Show whether a free token is stored
//! - `/stats` - Show session statistics
//! - `/help` - Show available commands
//! - `/quit` - Exit the application
//!
//! Questions are answered in the background: the prompt comes back as soon
//! as a question is sent, and answers and banners are printed above it as
//! they arrive.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use arrrg::CommandLine;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};
use tokio::sync::mpsc;

use veritly::chat::{
    Applied, ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, QueryDispatcher,
    Renderer, TokenBootstrapper, help_text, parse_command,
};
use veritly::{
    BannerBoard, ClientLogger, FileTokenStore, RagBackend, StderrLogger, TokenStore, VeritlyClient,
};

/// What the line reader saw.
enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(String),
}

/// Routes rendered output through rustyline so it lands above the prompt.
struct PromptWriter<P> {
    printer: P,
    buffer: Vec<u8>,
}

impl<P: ExternalPrinter + Send> Write for PromptWriter<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        let text = text.strip_suffix('\n').unwrap_or(&text).to_string();
        self.printer
            .print(text)
            .map_err(|err| io::Error::other(err.to_string()))
    }
}

/// Main entry point for the veritly-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("veritly-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = VeritlyClient::with_options(Some(config.base_url.clone()), config.timeout)?;
    let backend: Arc<dyn RagBackend> = Arc::new(client.clone());
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let logger: Arc<dyn ClientLogger> = Arc::new(StderrLogger::new(config.verbose));
    let banners = Arc::new(BannerBoard::new());
    let mut raised = banners.subscribe();

    // Bootstrap runs in the background; questions go out without a token
    // until it lands.
    let bootstrapper = TokenBootstrapper::new(backend.clone(), store.clone(), banners.clone())
        .with_logger(logger.clone());
    let _bootstrap = Arc::new(bootstrapper).spawn();

    let dispatcher = Arc::new(QueryDispatcher::new(backend, store.clone()).with_logger(logger));
    let mut session = ChatSession::with_banners(banners.clone());

    let mut rl = DefaultEditor::new()?;
    let out: Box<dyn Write + Send> = match rl.create_external_printer() {
        Ok(printer) => Box::new(PromptWriter {
            printer,
            buffer: Vec::new(),
        }),
        Err(_) => Box::new(io::stdout()),
    };
    let mut renderer = PlainTextRenderer::with_writer(out, config.use_color);

    renderer.print_info(&format!(
        "VeritlyAI (backend: {})\nType /help for commands, /quit to exit\n",
        client.base_url()
    ));
    print_conversation(&session, &mut renderer);

    let (line_tx, mut lines) = mpsc::unbounded_channel();
    let (resume, resume_rx) = std_mpsc::channel();
    std::thread::spawn(move || read_lines(rl, line_tx, resume_rx));

    let (done, mut completions) = mpsc::unbounded_channel();
    let mut shown_banner = 0;

    loop {
        tokio::select! {
            input = lines.recv() => match input.unwrap_or(Input::Eof) {
                Input::Line(line) => {
                    let line = line.trim();
                    let mut quit = false;
                    match parse_command(line) {
                        Some(ChatCommand::Quit) => quit = true,
                        Some(ChatCommand::New) => {
                            session.start_new();
                            print_conversation(&session, &mut renderer);
                        }
                        Some(ChatCommand::Clear) => {
                            session.clear();
                            print_conversation(&session, &mut renderer);
                        }
                        Some(ChatCommand::Dismiss) => {
                            if !banners.dismiss() {
                                renderer.print_info("No banner to dismiss.");
                            }
                        }
                        Some(ChatCommand::Token) => {
                            if store.has() {
                                renderer.print_info("A free token is stored.");
                            } else {
                                renderer.print_info(
                                    "No token stored; questions are sent without authorization.",
                                );
                            }
                        }
                        Some(ChatCommand::Help) => {
                            let help: Vec<String> =
                                help_text().lines().map(|l| format!("    {l}")).collect();
                            renderer.print_info(&help.join("\n"));
                        }
                        Some(ChatCommand::Stats) => {
                            renderer.print_info(&stats_text(&session, &dispatcher));
                        }
                        Some(ChatCommand::Invalid(message)) => {
                            renderer.print_error(&message);
                        }
                        None => {
                            if let Some(pending) = session.begin(&dispatcher, line) {
                                dispatcher.spawn(pending, done.clone());
                            }
                        }
                    }
                    let _ = resume.send(!quit);
                    if quit {
                        renderer.print_info("Goodbye!");
                        break;
                    }
                }
                Input::Interrupted => {
                    let _ = resume.send(true);
                }
                Input::Eof => {
                    renderer.print_info("Goodbye!");
                    break;
                }
                Input::Failed(err) => {
                    renderer.print_error(&format!("Input error: {err}"));
                    break;
                }
            },
            Some(completion) = completions.recv() => match session.apply(completion) {
                Applied::Message(id) => {
                    if let Some(message) = session.message(id) {
                        renderer.print_message(message);
                    }
                }
                Applied::Banner(banner) => {
                    shown_banner = banner.serial;
                    renderer.print_banner(&banner);
                }
            },
            Ok(()) = raised.changed() => {
                if let Some(banner) = banners.current()
                    && banner.serial > shown_banner
                {
                    shown_banner = banner.serial;
                    renderer.print_banner(&banner);
                }
            }
        }

        if renderer.is_closed() {
            break;
        }
    }

    Ok(())
}

/// Reads lines on a dedicated thread.  After each line it waits for the
/// main loop to say whether to prompt again.
fn read_lines(
    mut rl: DefaultEditor,
    lines: mpsc::UnboundedSender<Input>,
    resume: std_mpsc::Receiver<bool>,
) {
    loop {
        let input = match rl.readline("You: ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) => Input::Interrupted,
            Err(ReadlineError::Eof) => Input::Eof,
            Err(err) => Input::Failed(err.to_string()),
        };
        let last = matches!(input, Input::Eof | Input::Failed(_));
        if lines.send(input).is_err() || last {
            return;
        }
        if !resume.recv().unwrap_or(false) {
            return;
        }
    }
}

fn print_conversation(session: &ChatSession, renderer: &mut dyn Renderer) {
    if session.is_empty() {
        renderer.print_empty_state();
        return;
    }
    for message in session.messages() {
        renderer.print_message(message);
    }
}

fn stats_text(session: &ChatSession, dispatcher: &QueryDispatcher) -> String {
    let stats = session.stats();
    let mut lines = vec![
        "    Session Statistics:".to_string(),
        format!("      Messages: {}", stats.message_count),
        format!(
            "        ({} from you, {} from VeritlyAI)",
            stats.user_messages, stats.bot_messages
        ),
        format!("      Questions sent: {}", dispatcher.dispatched()),
        format!("      Answers: {}", stats.replies),
        format!("      Failures: {}", stats.failures),
    ];
    if stats.stale_completions > 0 {
        lines.push(format!(
            "      Out-of-order answers: {}",
            stats.stale_completions
        ));
    }
    let token = if dispatcher.has_token() {
        "stored"
    } else {
        "(none)"
    };
    lines.push(format!("      Token: {token}"));
    lines.join("\n")
}
