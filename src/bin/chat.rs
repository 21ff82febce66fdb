//! Terminal chat widget
//!
//! Reads one message per line from stdin and prints the assistant's reply
//! as it arrives.

use rivertown_chat::assembler::{Assembler, Role, Transcript};
use rivertown_chat::client::{ChatClient, ClientError};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_URL: &str = "http://127.0.0.1:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rivertown_chat=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::var("CHAT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let streaming = std::env::var("CHAT_STREAMING")
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
        .unwrap_or(true);

    let client = ChatClient::new(&url)?;
    let mut assembler = Assembler::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Rivertown Ball Company. Ask us anything about our wooden balls.");
    prompt()?;
    let mut printer = ReplyPrinter::new(io::stdout());
    while let Some(line) = lines.next_line().await? {
        let result = if streaming {
            client
                .send_streaming(&mut assembler, &line, |transcript| printer.update(transcript))
                .await
        } else {
            client.send(&mut assembler, &line).await
        };

        match result {
            Ok(()) => printer.finish(assembler.transcript())?,
            Err(ClientError::Submit(e)) => eprintln!("({e})"),
            Err(e) => return Err(e.into()),
        }
        prompt()?;
    }
    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

/// Renders the assistant reply as it grows.
///
/// Snapshot frames may rewrite earlier text; when the new text does not
/// extend what is on screen, it is printed again on a fresh line.
struct ReplyPrinter<W> {
    out: W,
    shown: String,
    error: Option<io::Error>,
}

impl<W: Write> ReplyPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
            error: None,
        }
    }

    /// Transcript callback; write failures are held until `finish`.
    fn update(&mut self, transcript: &Transcript) {
        let Some(turn) = transcript.open_turn() else {
            return;
        };
        if self.error.is_none() {
            if let Err(e) = self.show(&turn.text) {
                self.error = Some(e);
            }
        }
    }

    /// Print the finalized reply, including any error note.
    fn finish(&mut self, transcript: &Transcript) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            self.shown.clear();
            return Err(e);
        }
        if let Some(turn) = transcript.last() {
            if turn.role == Role::Assistant && !turn.is_blank() {
                self.show(&turn.display_text())?;
            }
        }
        if !self.shown.is_empty() {
            writeln!(self.out)?;
        }
        self.shown.clear();
        self.out.flush()
    }

    fn show(&mut self, text: &str) -> io::Result<()> {
        if text == self.shown {
            return Ok(());
        }
        match text.strip_prefix(self.shown.as_str()) {
            Some(tail) => write!(self.out, "{tail}")?,
            None => write!(self.out, "\n{text}")?,
        }
        self.shown = text.to_string();
        self.out.flush()
    }
}
