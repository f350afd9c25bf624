//! Stdin/stdout JSON bridge for the poll engine.
//!
//! Reads newline-delimited JSON `Command` messages from stdin, drives the
//! engine with them, and writes every `Notification` the engine emits as
//! newline-delimited JSON to stdout.
//!
//! Stdout is reserved for the protocol; tracing goes to stderr.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;

use crate::watcher::{Command, Engine, EngineSettings, Notification, NotificationSink};

/// Run the bridge on the process's stdin/stdout until stdin closes.
pub async fn run_stdio_bridge(settings: EngineSettings) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_bridge(stdin, tokio::io::stdout(), settings).await
}

/// Run the bridge over arbitrary line-oriented streams.
///
/// Two tasks cooperate:
///
/// 1. **Reader** (this task) -- parses each input line as a `Command` and
///    hands it to the engine. Unparseable lines become error-flagged logs.
/// 2. **Forwarder** -- serializes notifications and writes them out, one per
///    line, flushing after each.
///
/// When the input closes the engine is dropped, which cancels any active
/// run; the forwarder drains what is left and exits.
pub async fn run_bridge<R, W>(reader: R, writer: W, settings: EngineSettings) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    let mut engine = Engine::new(settings, tx.clone());

    let forwarder = tokio::spawn(async move {
        let mut writer = BufWriter::new(writer);
        while let Some(notification) = rx.recv().await {
            let json = match serde_json::to_string(&notification) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize notification; skipping");
                    continue;
                }
            };
            write_line(&mut writer, &json)
                .await
                .context("Failed to write notification")?;
        }
        Ok::<(), anyhow::Error>(())
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                tracing::debug!(?command, "received command");
                engine.handle(command);
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed command");
                tx.notify(Notification::error(format!("Invalid command: {}", e)));
            }
        }
    }

    tracing::info!("input closed (EOF); shutting down bridge");
    if engine.is_running() {
        tracing::debug!("cancelling active run");
    }
    drop(engine);
    drop(tx);

    forwarder.await.context("Notification forwarder panicked")?
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
