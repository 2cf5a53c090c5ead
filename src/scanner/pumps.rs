//! The concurrent activities of a scan session.
//!
//! Every pump watches the session's cancellation token, cancels it on any
//! I/O failure and reports how it ended through its return value. Pumps
//! talk to the client only through the bounded message channel, which a
//! single writer task drains into the client sink.

use crate::scanner::traits::{ClientEvents, ClientMessage, ClientSink};
use crate::types::TargetRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How the target-feed pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedEnd {
    /// Every target was written and the scanner's input closed.
    Exhausted,
    Cancelled,
    ClientGone,
    InputFailed,
}

/// Feed each target to the scanner, announcing it to the client first.
pub(crate) async fn feed_targets(
    targets: Vec<TargetRecord>,
    mut stdin: ChildStdin,
    client: mpsc::Sender<ClientMessage>,
    cancel: CancellationToken,
    fed: Arc<AtomicUsize>,
) -> FeedEnd {
    for target in targets {
        let line = format!("{}\n", target.value);

        let notified = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FeedEnd::Cancelled,
            sent = client.send(ClientMessage::Target(target)) => sent.is_ok(),
        };
        if !notified {
            cancel.cancel();
            return FeedEnd::ClientGone;
        }

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FeedEnd::Cancelled,
            written = stdin.write_all(line.as_bytes()) => written,
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "scanner input write failed");
            cancel.cancel();
            return FeedEnd::InputFailed;
        }

        fed.fetch_add(1, Ordering::Relaxed);
    }

    // Closing stdin tells the scanner the target list is complete.
    if let Err(e) = stdin.shutdown().await {
        tracing::debug!(error = %e, "scanner input already closed");
    }
    FeedEnd::Exhausted
}

/// How the output-relay pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RelayEnd {
    /// The scanner closed its output.
    #[default]
    Exhausted,
    Cancelled,
    ClientGone,
    ReadFailed,
}

/// Counters and end state of the output-relay pump.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RelayReport {
    pub end: RelayEnd,
    pub chunks: u64,
    pub bytes: u64,
}

/// Forward scanner output to the client in chunks of at most `chunk_size`.
pub(crate) async fn relay_output(
    mut stdout: ChildStdout,
    client: mpsc::Sender<ClientMessage>,
    cancel: CancellationToken,
    chunk_size: usize,
) -> RelayReport {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut report = RelayReport::default();

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.end = RelayEnd::Cancelled;
                break;
            }
            read = stdout.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => {
                report.end = RelayEnd::Exhausted;
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "scanner output read failed");
                cancel.cancel();
                report.end = RelayEnd::ReadFailed;
                break;
            }
        };

        if client.send(ClientMessage::Output(buf[..n].to_vec())).await.is_err() {
            cancel.cancel();
            report.end = RelayEnd::ClientGone;
            break;
        }

        report.chunks += 1;
        report.bytes += n as u64;
    }

    report
}

/// How the cancellation watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchEnd {
    /// The client went away; the session was cancelled.
    Disconnected,
    /// The session ended for another reason.
    Stopped,
}

/// Cancel the session as soon as the client disconnects.
pub(crate) async fn watch_disconnect<E: ClientEvents>(
    mut events: E,
    cancel: CancellationToken,
) -> WatchEnd {
    tokio::select! {
        biased;
        _ = events.closed() => {
            cancel.cancel();
            WatchEnd::Disconnected
        }
        _ = cancel.cancelled() => WatchEnd::Stopped,
    }
}

/// Drain the message channel into the client sink.
///
/// Stops at cancellation without delivering anything further, or once every
/// sender is gone and the queue is empty. Hands the sink back for closing.
pub(crate) async fn forward_to_client<S: ClientSink>(
    mut sink: S,
    mut messages: mpsc::Receiver<ClientMessage>,
    cancel: CancellationToken,
) -> S {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = messages.recv() => next,
        };
        let Some(message) = next else {
            break;
        };

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = sink.send(message) => sent,
        };
        if let Err(e) = sent {
            tracing::debug!(error = %e, "client write failed");
            cancel.cancel();
            break;
        }
    }

    sink
}
