//! The exec result protocol.
//!
//! [`Execable::exec`](crate::Execable::exec) returns as soon as the command
//! is launched. Completion is observed through two independent halves of an
//! [`ExecResult`]:
//!
//! - [`ExecOutput`]: the output chunks, in arrival order per stream. No
//!   ordering is promised across streams. The sequence ends exactly once:
//!   when the producer is done, right after an error chunk, or when the
//!   context is cancelled. Nothing is yielded after that.
//! - [`ExitCode`]: resolves once the process exits.
//!
//! The output channel is bounded, so a consumer that never drains it will
//! eventually stall the producer.

use std::process::Stdio;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};

use crate::{Context, Error, ExecOptions, Result};

const DEFAULT_CAPACITY: usize = 64;
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Which output stream a chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamId {
    Stdout,
    Stderr,
}

#[derive(Debug)]
pub struct ExecOutputChunk {
    pub stream: StreamId,
    pub timestamp: DateTime<Utc>,
    /// Data, or the error that ended the output.
    pub payload: std::result::Result<Bytes, Error>,
}

impl ExecOutputChunk {
    pub fn data(stream: StreamId, data: Bytes) -> Self {
        Self {
            stream,
            timestamp: Utc::now(),
            payload: Ok(data),
        }
    }

    pub fn error(stream: StreamId, err: Error) -> Self {
        Self {
            stream,
            timestamp: Utc::now(),
            payload: Err(err),
        }
    }

    pub fn is_error(&self) -> bool {
        self.payload.is_err()
    }
}

/// Producer half for output chunks. Clone it once per stream.
#[derive(Clone, Debug)]
pub struct OutputSender {
    tx: mpsc::Sender<ExecOutputChunk>,
}

impl OutputSender {
    /// Fails once the consumer has gone away or closed the output.
    pub async fn send(&self, stream: StreamId, data: impl Into<Bytes>) -> Result<()> {
        self.tx
            .send(ExecOutputChunk::data(stream, data.into()))
            .await
            .map_err(|_| Error::exec("exec output is closed"))
    }

    /// Send a terminal error. The consumer stops reading after it.
    pub async fn send_error(&self, stream: StreamId, err: Error) -> Result<()> {
        self.tx
            .send(ExecOutputChunk::error(stream, err))
            .await
            .map_err(|_| Error::exec("exec output is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Producer half for the exit code.
#[derive(Debug)]
pub struct ExitSender {
    tx: oneshot::Sender<Result<i32>>,
}

impl ExitSender {
    pub fn resolve(self, exit_code: Result<i32>) {
        // The consumer may have stopped waiting.
        let _ = self.tx.send(exit_code);
    }
}

/// Consumer half for output chunks.
#[derive(Debug)]
pub struct ExecOutput {
    rx: mpsc::Receiver<ExecOutputChunk>,
    ctx: Context,
    closed: bool,
}

impl ExecOutput {
    /// The next chunk, or `None` once the sequence has ended.
    pub async fn next(&mut self) -> Option<ExecOutputChunk> {
        if self.closed {
            return None;
        }
        let chunk = tokio::select! {
            biased;
            _ = self.ctx.cancelled() => None,
            chunk = self.rx.recv() => chunk,
        };
        match chunk {
            Some(chunk) if chunk.is_error() => {
                self.close();
                Some(chunk)
            }
            Some(chunk) => Some(chunk),
            None => {
                self.close();
                None
            }
        }
    }

    /// Drain every remaining chunk.
    pub async fn collect(mut self) -> Vec<ExecOutputChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next().await {
            chunks.push(chunk);
        }
        chunks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        self.closed = true;
        self.rx.close();
    }
}

/// Consumer half for the exit code.
#[derive(Debug)]
pub struct ExitCode {
    rx: oneshot::Receiver<Result<i32>>,
    ctx: Context,
}

impl ExitCode {
    /// Wait for the process to exit.
    pub async fn wait(self) -> Result<i32> {
        let ExitCode { rx, ctx } = self;
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(Error::Cancelled),
            exit = rx => exit.unwrap_or_else(|_| {
                Err(Error::exec("exec finished without reporting an exit code"))
            }),
        }
    }
}

/// The result of invoking an exec action.
#[derive(Debug)]
pub struct ExecResult {
    pub output: ExecOutput,
    pub exit_code: ExitCode,
}

impl ExecResult {
    /// Create a connected producer/consumer set. Cancelling `ctx` ends the
    /// output and makes the exit code resolve to [`Error::Cancelled`].
    pub fn channel(ctx: &Context, capacity: usize) -> (OutputSender, ExitSender, ExecResult) {
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));
        let (exit_tx, exit_rx) = oneshot::channel();
        let result = ExecResult {
            output: ExecOutput {
                rx: out_rx,
                ctx: ctx.clone(),
                closed: false,
            },
            exit_code: ExitCode {
                rx: exit_rx,
                ctx: ctx.clone(),
            },
        };
        (OutputSender { tx: out_tx }, ExitSender { tx: exit_tx }, result)
    }

    /// An already finished exec with fixed stdout, for backends that run
    /// commands synchronously.
    pub async fn completed(ctx: &Context, stdout: impl Into<Bytes>, exit_code: i32) -> Self {
        let (output, exit, result) = ExecResult::channel(ctx, 1);
        let stdout = stdout.into();
        if !stdout.is_empty() {
            // Capacity 1 and no other producer, so this never waits.
            let _ = output.send(StreamId::Stdout, stdout).await;
        }
        exit.resolve(Ok(exit_code));
        result
    }
}

/// Launch `cmd` as a local process and stream its output.
///
/// Stdout and stderr are always piped. The exit code resolves as soon as
/// the child exits; output keeps flowing until every holder of the pipes
/// (including background grandchildren) closes them. The child is killed if
/// `ctx` is cancelled before it exits.
pub fn spawn_command(
    ctx: &Context,
    mut cmd: tokio::process::Command,
    opts: ExecOptions,
) -> Result<ExecResult> {
    ctx.check()?;

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if opts.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);
    let mut child = cmd.spawn()?;
    log::debug!("spawned exec process {:?}", child.id());

    let (output, exit, result) = ExecResult::channel(ctx, DEFAULT_CAPACITY);

    if let (Some(mut input), Some(mut child_stdin)) = (opts.stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = tokio::io::copy(&mut input, &mut child_stdin).await {
                log::debug!("failed to feed exec stdin: {}", e);
            }
        });
    }

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, StreamId::Stdout, output.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, StreamId::Stderr, output.clone()));
    }
    drop(output);

    let ctx = ctx.clone();
    tokio::spawn(async move {
        let finished = tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let exit_code = match finished {
            Some(status) => status.map_err(Error::from).and_then(|status| {
                status
                    .code()
                    .ok_or_else(|| Error::exec(format!("process terminated: {}", status)))
            }),
            None => {
                if let Err(e) = child.kill().await {
                    log::warn!("failed to kill cancelled exec process: {}", e);
                }
                Err(Error::Cancelled)
            }
        };
        exit.resolve(exit_code);
    });

    Ok(result)
}

async fn pump<R>(mut reader: R, stream: StreamId, output: OutputSender)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if output
                    .send(stream, Bytes::copy_from_slice(&buf[..n]))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                let _ = output.send_error(stream, e.into()).await;
                break;
            }
        }
    }
}
