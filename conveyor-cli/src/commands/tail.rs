//! `conveyor tail` command handler
//!
//! Copies one remote log stream to stdout until Ctrl-C or until the poller fails.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use conveyor_core::config::{ConveyorConfig, LogStreamConfig};
use conveyor_log_stream::{
    CloudWatchLogSource, LogStreamReaderBuilder, PollerExit, PollerState, PollerStatsSnapshot,
    ReaderConfig,
};

use crate::cli::TailArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `tail` command.
///
/// # Errors
///
/// Returns `CliError::Config` for invalid reader settings, `CliError::Stream`
/// when the poller stops after exhausting its retries, and `CliError::Io`
/// when stdout can no longer be written.
pub async fn execute(
    args: TailArgs,
    config: ConveyorConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut stream_config = config.log_stream;
    apply_overrides(&mut stream_config, &args);
    let reader_config = ReaderConfig::from_core(&stream_config)?;

    let source =
        CloudWatchLogSource::from_env(stream_config.region.clone(), stream_config.start_from_head)
            .await;
    let mut reader = LogStreamReaderBuilder::new(Arc::new(source))
        .stream(args.group, args.stream)
        .config(reader_config)
        .build()?;

    let shutdown = reader.shutdown_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping log stream");
            shutdown.cancel();
        }
    });

    let mut stdout = tokio::io::stdout();
    let (bytes_written, copied) = pump(&mut reader, &mut stdout).await;
    interrupt.abort();
    stdout.flush().await?;

    let exit = reader.shutdown().await?;
    let summary = TailSummary {
        stream: reader.identity().to_string(),
        reader_id: reader.reader_id().to_string(),
        bytes_written,
        state: reader.state(),
        stats: reader.stats(),
    };
    if args.summary {
        writer.render_stderr(&summary)?;
    }

    match (copied, exit) {
        (Ok(()), PollerExit::Cancelled) => Ok(()),
        (_, PollerExit::Failed(e)) => {
            warn!(error = %e, "log stream ended after query failure");
            Err(CliError::Stream(e.to_string()))
        }
        (Err(e), PollerExit::Cancelled) => Err(CliError::Io(e)),
    }
}

/// Copy `reader` into `writer` until EOF or the first I/O error.
///
/// The byte count covers everything written before an error, so a summary
/// stays accurate even when stdout goes away mid-stream.
async fn pump<R, W>(reader: &mut R, writer: &mut W) -> (u64, std::io::Result<()>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = vec![0u8; 8 * 1024];
    let mut written = 0u64;
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => return (written, Ok(())),
            Ok(n) => n,
            Err(e) => return (written, Err(e)),
        };
        if let Err(e) = writer.write_all(&chunk[..n]).await {
            return (written, Err(e));
        }
        written += n as u64;
    }
}

/// Apply command-line flags on top of the loaded `[log_stream]` section.
fn apply_overrides(config: &mut LogStreamConfig, args: &TailArgs) {
    if args.start_from_head {
        config.start_from_head = true;
    }
    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
}

/// Summary of one `tail` run.
#[derive(Serialize)]
pub struct TailSummary {
    /// Stream read (group/stream)
    pub stream: String,
    /// Reader instance id, matching the `reader_id` field in logs
    pub reader_id: String,
    /// Bytes written to stdout
    pub bytes_written: u64,
    /// Final poller state
    pub state: PollerState,
    /// Poller counters
    pub stats: PollerStatsSnapshot,
}

impl Render for TailSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Log Stream: {}", self.stream.bold())?;
        writeln!(w, "  Reader:        {}", self.reader_id)?;
        match &self.state {
            PollerState::Failed(reason) => {
                writeln!(w, "  State:         {}", "FAILED".red().bold())?;
                writeln!(w, "  Error:         {}", reason.red())?;
            }
            other => writeln!(w, "  State:         {}", other.name())?,
        }
        writeln!(w, "  Bytes written: {}", self.bytes_written)?;
        writeln!(w, "  Events:        {}", self.stats.events)?;
        writeln!(
            w,
            "  Queries:       {} ({} empty, {} failed, {} retried)",
            self.stats.queries, self.stats.empty_polls, self.stats.query_errors, self.stats.retries
        )?;
        if self.stats.backpressure_skips > 0 {
            writeln!(w, "  Deferred:      {}", self.stats.backpressure_skips)?;
        }
        if self.stats.bytes_dropped > 0 {
            writeln!(w, "  Dropped bytes: {}", self.stats.bytes_dropped)?;
        }
        Ok(())
    }
}
