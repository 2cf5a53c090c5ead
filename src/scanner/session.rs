//! Scan session driver.

use crate::config::AppSettings;
use crate::scanner::process::ScannerCommand;
use crate::scanner::pumps::{
    feed_targets, forward_to_client, relay_output, watch_disconnect, FeedEnd, RelayEnd,
    RelayReport, WatchEnd,
};
use crate::scanner::traits::{ClientEvents, ClientMessage, ClientSink};
use crate::scanner::{SessionReport, SessionState};
use crate::types::{SessionId, TargetRecord};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How long a finished session waits for queued messages to reach the client.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_CLIENT_BUFFER: usize = 64;

/// One scan of a target list, streamed to one client.
///
/// Owns its scanner process exclusively. Running consumes the session, so
/// teardown happens exactly once.
#[derive(Debug)]
pub struct ScanSession {
    id: SessionId,
    command: ScannerCommand,
    chunk_size: usize,
    client_buffer: usize,
    state: SessionState,
}

impl ScanSession {
    /// Create an idle session with default chunk and queue sizes.
    pub fn new(command: ScannerCommand) -> Self {
        Self {
            id: SessionId::new(),
            command,
            chunk_size: DEFAULT_CHUNK_SIZE,
            client_buffer: DEFAULT_CLIENT_BUFFER,
            state: SessionState::Idle,
        }
    }

    /// Build from application settings.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(ScannerCommand::from_settings(settings))
            .with_chunk_size(settings.output_chunk_size)
            .with_client_buffer(settings.client_buffer)
    }

    /// Largest output chunk relayed in one message.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Capacity of the queue between the pumps and the client.
    pub fn with_client_buffer(mut self, capacity: usize) -> Self {
        self.client_buffer = capacity.max(1);
        self
    }

    /// Identifier carried by this session's logs and report.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Scan `targets`, streaming notifications and output to `sink` until
    /// the scanner finishes, `events` reports a disconnect, or a stream
    /// fails.
    ///
    /// Always tears down fully: the scanner is reaped (killed unless it
    /// completed) and the sink is closed.
    pub async fn run<S, E>(mut self, targets: Vec<TargetRecord>, mut sink: S, events: E) -> SessionReport
    where
        S: ClientSink,
        E: ClientEvents,
    {
        let mut report = SessionReport::new(self.id, targets.len());

        let (mut process, pipes) = match self.command.spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "scanner failed to start");
                if let Err(send_err) = sink.send(ClientMessage::Error(e.to_string())).await {
                    tracing::debug!(session = %self.id, error = %send_err, "could not report spawn failure");
                }
                sink.close().await;
                self.state.advance(SessionState::Failed);
                return self.finish(report);
            }
        };

        self.state.advance(SessionState::Running);
        tracing::info!(
            session = %self.id,
            program = %self.command.program(),
            pid = ?process.id(),
            targets = report.targets_total,
            "scan session running"
        );

        let cancel = CancellationToken::new();
        let fed = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel(self.client_buffer);

        let writer = tokio::spawn(forward_to_client(sink, rx, cancel.clone()));
        let watcher = tokio::spawn(watch_disconnect(events, cancel.clone()));
        let mut feed = tokio::spawn(feed_targets(
            targets,
            pipes.stdin,
            tx.clone(),
            cancel.clone(),
            Arc::clone(&fed),
        ));
        let mut relay = tokio::spawn(relay_output(pipes.stdout, tx, cancel.clone(), self.chunk_size));

        let relayed = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            relayed = &mut relay => Some(relayed),
        };

        // Output exhausted: let the scanner exit on its own unless the
        // session is cancelled meanwhile.
        let mut completed = false;
        if matches!(&relayed, Some(Ok(r)) if r.end == RelayEnd::Exhausted) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                status = process.wait() => match status {
                    Ok(status) => {
                        report.exit_code = status.code();
                        completed = true;
                    }
                    Err(e) => {
                        tracing::warn!(session = %self.id, error = %e, "failed to wait for scanner");
                    }
                },
            }
        }

        // The scan only completed if every target reached the scanner. A
        // scanner that exits early leaves the feed with a broken pipe.
        let mut fed_result = None;
        if completed {
            match timeout(DRAIN_TIMEOUT, &mut feed).await {
                Ok(joined) => fed_result = Some(joined),
                Err(_) => {
                    tracing::warn!(session = %self.id, "target feed still blocked after scanner exit");
                }
            }
            completed = matches!(fed_result, Some(Ok(FeedEnd::Exhausted)));
        }

        if !completed {
            cancel.cancel();
            report.killed = process.kill().await;
        }

        let sink = reclaim_sink(writer, &cancel).await;
        cancel.cancel();

        let relay_report = match relayed {
            Some(joined) => joined,
            None => relay.await,
        };
        match relay_report {
            Ok(RelayReport { end, chunks, bytes }) => {
                report.chunks_relayed = chunks;
                report.bytes_relayed = bytes;
                tracing::debug!(session = %self.id, ?end, "output relay stopped");
            }
            Err(e) => tracing::warn!(session = %self.id, error = %e, "output relay task failed"),
        }

        let fed_result = match fed_result {
            Some(joined) => joined,
            None => feed.await,
        };
        match fed_result {
            Ok(end) => tracing::debug!(session = %self.id, ?end, "target feed stopped"),
            Err(e) => tracing::warn!(session = %self.id, error = %e, "target feed task failed"),
        }
        report.targets_fed = fed.load(Ordering::Relaxed);

        let disconnected = matches!(watcher.await, Ok(WatchEnd::Disconnected));

        process.release().await;
        if let Some(mut sink) = sink {
            sink.close().await;
        }

        let terminal = if completed {
            SessionState::Completed
        } else if disconnected {
            SessionState::Cancelled
        } else {
            SessionState::Failed
        };
        self.state.advance(terminal);

        self.finish(report)
    }

    fn finish(self, mut report: SessionReport) -> SessionReport {
        report.state = self.state;
        report.finished_at = Some(Utc::now());

        tracing::info!(
            session = %self.id,
            state = %report.state,
            fed = report.targets_fed,
            total = report.targets_total,
            bytes = report.bytes_relayed,
            exit_code = ?report.exit_code,
            killed = report.killed,
            duration_ms = ?report.duration_ms(),
            "scan session finished"
        );
        report
    }
}

/// Wait for the writer to hand back the sink, cutting the drain short if
/// the client stops reading.
async fn reclaim_sink<S: ClientSink>(
    mut writer: JoinHandle<S>,
    cancel: &CancellationToken,
) -> Option<S> {
    let joined = match timeout(DRAIN_TIMEOUT, &mut writer).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!("client drain timed out");
            cancel.cancel();
            writer.await
        }
    };

    match joined {
        Ok(sink) => Some(sink),
        Err(e) => {
            tracing::warn!(error = %e, "client writer task failed");
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::{SessionError, SessionResult};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct Recorded {
        messages: Vec<ClientMessage>,
        closed: bool,
    }

    /// Records everything; optionally reports a disconnect after the first
    /// message and refuses writes from then on.
    struct RecordingSink {
        recorded: Arc<Mutex<Recorded>>,
        disconnect: Option<oneshot::Sender<()>>,
        gone: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl ClientSink for RecordingSink {
        async fn send(&mut self, message: ClientMessage) -> SessionResult<()> {
            if self.gone || self.fail_writes {
                return Err(SessionError::ClientClosed);
            }
            self.recorded.lock().unwrap().messages.push(message);
            if let Some(disconnect) = self.disconnect.take() {
                let _ = disconnect.send(());
                self.gone = true;
            }
            Ok(())
        }

        async fn close(&mut self) {
            self.recorded.lock().unwrap().closed = true;
        }
    }

    /// Reports a disconnect when its trigger fires; never otherwise.
    struct TriggeredEvents {
        trigger: Option<oneshot::Receiver<()>>,
    }

    #[async_trait]
    impl ClientEvents for TriggeredEvents {
        async fn closed(&mut self) {
            match self.trigger.as_mut() {
                Some(trigger) => {
                    if trigger.await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn client() -> (RecordingSink, TriggeredEvents, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let sink = RecordingSink {
            recorded: Arc::clone(&recorded),
            disconnect: None,
            gone: false,
            fail_writes: false,
        };
        (sink, TriggeredEvents { trigger: None }, recorded)
    }

    fn targets(values: &[&str]) -> Vec<TargetRecord> {
        values.iter().map(|v| TargetRecord::domain(*v)).collect()
    }

    fn output_of(messages: &[ClientMessage]) -> Vec<u8> {
        messages
            .iter()
            .filter_map(|m| match m {
                ClientMessage::Output(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[tokio::test]
    async fn test_completed_session_relays_output() {
        let (sink, events, recorded) = client();
        let session = ScanSession::new(ScannerCommand::new("cat", Vec::<String>::new()));

        let report = session
            .run(targets(&["a.example.com", "b.example.com", "c.example.com"]), sink, events)
            .await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.exit_code, Some(0));
        assert!(!report.killed);
        assert_eq!(report.targets_fed, 3);
        assert!(report.finished_at.is_some());

        let recorded = recorded.lock().unwrap();
        assert!(recorded.closed);
        assert_eq!(
            recorded.messages[0],
            ClientMessage::Target(TargetRecord::domain("a.example.com"))
        );
        let notified: Vec<&ClientMessage> =
            recorded.messages.iter().filter(|m| m.is_target()).collect();
        assert_eq!(notified.len(), 3);
        assert_eq!(
            output_of(&recorded.messages),
            b"a.example.com\nb.example.com\nc.example.com\n".to_vec()
        );
        assert_eq!(report.bytes_relayed, 42);
    }

    #[tokio::test]
    async fn test_small_chunks() {
        let (sink, events, recorded) = client();
        let session =
            ScanSession::new(ScannerCommand::new("cat", Vec::<String>::new())).with_chunk_size(4);

        let report = session.run(targets(&["abcdefghij"]), sink, events).await;

        assert_eq!(report.state, SessionState::Completed);
        let recorded = recorded.lock().unwrap();
        for message in &recorded.messages {
            if let ClientMessage::Output(bytes) = message {
                assert!(bytes.len() <= 4);
            }
        }
        assert_eq!(output_of(&recorded.messages), b"abcdefghij\n".to_vec());
        assert!(report.chunks_relayed >= 3);
    }

    #[tokio::test]
    async fn test_empty_target_list_completes() {
        let (sink, events, recorded) = client();
        let session = ScanSession::new(ScannerCommand::new("cat", Vec::<String>::new()));

        let report = session.run(Vec::new(), sink, events).await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.targets_fed, 0);
        assert!(recorded.lock().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_cancels_and_kills() {
        let (mut sink, _, recorded) = client();
        let (trigger_tx, trigger_rx) = oneshot::channel();
        sink.disconnect = Some(trigger_tx);
        let events = TriggeredEvents {
            trigger: Some(trigger_rx),
        };
        let session = ScanSession::new(ScannerCommand::new("sleep", ["30"]));

        let report = timeout(
            Duration::from_secs(10),
            session.run(targets(&["a.example.com", "b.example.com", "c.example.com"]), sink, events),
        )
        .await
        .unwrap();

        assert_eq!(report.state, SessionState::Cancelled);
        assert!(report.killed);
        assert_eq!(report.exit_code, None);

        let recorded = recorded.lock().unwrap();
        assert_eq!(
            recorded.messages,
            vec![ClientMessage::Target(TargetRecord::domain("a.example.com"))]
        );
    }

    fn many_targets(count: usize) -> Vec<TargetRecord> {
        (0..count)
            .map(|i| TargetRecord::domain(format!("host{i}.example.com")))
            .collect()
    }

    #[tokio::test]
    async fn test_scanner_exiting_early_fails_session() {
        // Exits without reading its input, so the feed hits a broken pipe.
        for _ in 0..5 {
            let (sink, events, recorded) = client();
            let session = ScanSession::new(ScannerCommand::new("sh", ["-c", "echo hi; exit 0"]));

            let report = timeout(
                Duration::from_secs(20),
                session.run(many_targets(20_000), sink, events),
            )
            .await
            .unwrap();

            assert_eq!(report.state, SessionState::Failed);
            assert!(report.targets_fed < report.targets_total);
            assert!(recorded.lock().unwrap().closed);
        }
    }

    #[tokio::test]
    async fn test_scanner_closing_input_is_killed() {
        let (sink, events, recorded) = client();
        let session =
            ScanSession::new(ScannerCommand::new("sh", ["-c", "exec 0<&-; exec sleep 30"]));

        let report = timeout(
            Duration::from_secs(10),
            session.run(many_targets(20_000), sink, events),
        )
        .await
        .unwrap();

        assert_eq!(report.state, SessionState::Failed);
        assert!(report.killed);
        assert_eq!(report.exit_code, None);
        assert!(report.targets_fed < report.targets_total);
        assert!(recorded.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_disconnect_while_waiting_for_exit() {
        let (sink, _, recorded) = client();
        let (trigger_tx, trigger_rx) = oneshot::channel();
        let events = TriggeredEvents {
            trigger: Some(trigger_rx),
        };
        // Output closes at once but the process keeps running.
        let session =
            ScanSession::new(ScannerCommand::new("sh", ["-c", "exec 1>&-; exec sleep 30"]));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = trigger_tx.send(());
        });

        let report = timeout(Duration::from_secs(10), session.run(Vec::new(), sink, events))
            .await
            .unwrap();

        assert_eq!(report.state, SessionState::Cancelled);
        assert!(report.killed);
        assert_eq!(report.exit_code, None);
        assert_eq!(report.bytes_relayed, 0);
        assert!(recorded.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_client_write_failure_fails_session() {
        let (mut sink, events, recorded) = client();
        sink.fail_writes = true;
        let session = ScanSession::new(ScannerCommand::new("sleep", ["30"]));

        let report = timeout(
            Duration::from_secs(10),
            session.run(targets(&["a.example.com"]), sink, events),
        )
        .await
        .unwrap();

        assert_eq!(report.state, SessionState::Failed);
        assert!(report.killed);
        assert!(recorded.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_spawn_failure_reports_error() {
        let (sink, events, recorded) = client();
        let session = ScanSession::new(ScannerCommand::new(
            "/nonexistent/scanner",
            Vec::<String>::new(),
        ));

        let report = session.run(targets(&["a.example.com"]), sink, events).await;

        assert_eq!(report.state, SessionState::Failed);
        assert_eq!(report.targets_fed, 0);
        assert!(!report.killed);

        let recorded = recorded.lock().unwrap();
        assert!(recorded.closed);
        assert_eq!(recorded.messages.len(), 1);
        assert!(matches!(recorded.messages[0], ClientMessage::Error(_)));
    }

    #[tokio::test]
    async fn test_from_settings_uses_configured_sizes() {
        let settings = AppSettings {
            output_chunk_size: 16,
            client_buffer: 2,
            ..AppSettings::default()
        };
        let session = ScanSession::from_settings(&settings);
        assert_eq!(session.chunk_size, 16);
        assert_eq!(session.client_buffer, 2);
        assert_eq!(session.state, SessionState::Idle);
    }
}
