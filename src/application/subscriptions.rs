//! Shared status-stream subscriptions.
//!
//! One [`StreamState`] exists per task id, shared by every observer that
//! subscribed to it. The first subscriber spawns a driver task that opens
//! the connection and folds inbound frames into the state; the last release
//! cancels the driver and forgets the state. Observers are notified through
//! a broadcast channel and read consistent snapshots of the shared state.

use crate::config::ClientConfig;
use crate::domain::outcome::{resolve, TaskOutcome};
use crate::domain::progress::ProgressView;
use crate::domain::status::{decode_frame, StatusMessage};
use crate::ports::stream::StreamConnector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle of one task's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Uninstantiated,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Notification pushed to observers when the shared state changes.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    PhaseChanged(StreamPhase),
    /// A decoded message was appended to the history.
    MessageAppended(StatusMessage),
    /// A frame could not be decoded; the stream continues.
    FrameRejected,
}

/// Shared per-task record: connection phase plus the ordered history of
/// decoded messages. Mutated only by the driver task and the release path.
#[derive(Debug)]
pub struct StreamState {
    pub phase: StreamPhase,
    pub history: Vec<StatusMessage>,
    pub rejected_frames: usize,
    observers: usize,
}

impl StreamState {
    fn new() -> Self {
        Self {
            phase: StreamPhase::Uninstantiated,
            history: Vec::new(),
            rejected_frames: 0,
            observers: 0,
        }
    }
}

/// Fold one inbound frame into the state.
///
/// Messages are appended in arrival order, never reordered or corrected;
/// decoding failures are counted and reported but non-fatal.
fn apply_frame(state: &mut StreamState, raw: &str) -> StreamEvent {
    match decode_frame(raw) {
        Ok(message) => {
            state.history.push(message.clone());
            StreamEvent::MessageAppended(message)
        }
        Err(e) => {
            state.rejected_frames += 1;
            tracing::warn!("{}", e);
            StreamEvent::FrameRejected
        }
    }
}

struct SharedStream {
    state: Mutex<StreamState>,
    events: broadcast::Sender<StreamEvent>,
    cancel: CancellationToken,
}

impl SharedStream {
    fn set_phase(&self, phase: StreamPhase) {
        {
            let mut state = self.state.lock().unwrap();
            // Closed is final
            if state.phase == StreamPhase::Closed {
                return;
            }
            state.phase = phase;
        }
        let _ = self.events.send(StreamEvent::PhaseChanged(phase));
    }
}

/// One observer's reference to a task's shared stream.
///
/// Handles are acquired with [`SubscriptionRegistry::subscribe`] and given
/// back with [`SubscriptionRegistry::release`]; the pairing is explicit
/// rather than tied to drop order.
pub struct SubscriptionHandle {
    task_id: String,
    shared: Arc<SharedStream>,
    released: bool,
}

impl SubscriptionHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Snapshot of the connection phase.
    pub fn phase(&self) -> StreamPhase {
        self.shared.state.lock().unwrap().phase
    }

    /// Snapshot of the full accumulated history, including everything that
    /// arrived before this observer subscribed.
    pub fn history(&self) -> Vec<StatusMessage> {
        self.shared.state.lock().unwrap().history.clone()
    }

    /// Latest message, if any has arrived.
    pub fn latest(&self) -> Option<StatusMessage> {
        self.shared.state.lock().unwrap().history.last().cloned()
    }

    /// Number of inbound frames dropped as undecodable.
    pub fn rejected_frames(&self) -> usize {
        self.shared.state.lock().unwrap().rejected_frames
    }

    /// True once a finished/failed message has arrived. Messages after a
    /// terminal one are still recorded but carry no further meaning.
    pub fn is_terminal(&self) -> bool {
        self.shared
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .any(|m| m.is_terminal())
    }

    /// Progress derived from the current history.
    pub fn progress(&self) -> ProgressView {
        ProgressView::from_history(&self.shared.state.lock().unwrap().history)
    }

    /// Outcome derived from the latest message.
    pub fn outcome(&self, config: &ClientConfig) -> TaskOutcome {
        match self.latest() {
            Some(message) => resolve(&message, &self.task_id, config),
            None => TaskOutcome::Pending,
        }
    }

    /// Subscribe to change notifications for this stream.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.shared.events.subscribe()
    }
}

/// Arena of per-task shared streams, keyed by task id.
///
/// Must live inside a tokio runtime: `subscribe` spawns the driver task
/// that owns the underlying connection.
pub struct SubscriptionRegistry<C> {
    connector: Arc<C>,
    config: ClientConfig,
    streams: Mutex<HashMap<String, Arc<SharedStream>>>,
}

impl<C> SubscriptionRegistry<C>
where
    C: StreamConnector + 'static,
{
    pub fn new(connector: C, config: ClientConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire a handle to `task_id`'s stream.
    ///
    /// The underlying connection is opened only for the first observer;
    /// later observers share the same state and see the same history.
    pub fn subscribe(&self, task_id: &str) -> SubscriptionHandle {
        let mut streams = self.streams.lock().unwrap();

        if let Some(shared) = streams.get(task_id) {
            let shared = Arc::clone(shared);
            shared.state.lock().unwrap().observers += 1;
            return SubscriptionHandle {
                task_id: task_id.to_string(),
                shared,
                released: false,
            };
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(SharedStream {
            state: Mutex::new(StreamState::new()),
            events,
            cancel: CancellationToken::new(),
        });
        shared.state.lock().unwrap().observers = 1;
        streams.insert(task_id.to_string(), Arc::clone(&shared));

        let url = self.config.task_stream_url(task_id);
        tokio::spawn(drive_stream(
            Arc::clone(&self.connector),
            Arc::clone(&shared),
            url,
        ));

        SubscriptionHandle {
            task_id: task_id.to_string(),
            shared,
            released: false,
        }
    }

    /// Release one observer. Idempotent and always safe; the last release
    /// tears the connection down and forgets the task's state, so a later
    /// subscribe starts fresh.
    pub fn release(&self, handle: &mut SubscriptionHandle) {
        if handle.released {
            return;
        }
        handle.released = true;

        let mut streams = self.streams.lock().unwrap();
        let (remaining, phase) = {
            let mut state = handle.shared.state.lock().unwrap();
            state.observers = state.observers.saturating_sub(1);
            (state.observers, state.phase)
        };

        if remaining > 0 {
            return;
        }

        // A later subscribe may own this task id by now; only remove our entry
        if let Some(current) = streams.get(handle.task_id.as_str()) {
            if Arc::ptr_eq(current, &handle.shared) {
                streams.remove(handle.task_id.as_str());
            }
        }
        drop(streams);

        if phase != StreamPhase::Closed {
            handle.shared.set_phase(StreamPhase::Closing);
        }
        handle.shared.cancel.cancel();
    }

    /// Number of task streams currently held open.
    pub fn active_streams(&self) -> usize {
        self.streams.lock().unwrap().len()
    }
}

/// Owns one task's connection from open to close.
async fn drive_stream<C>(connector: Arc<C>, shared: Arc<SharedStream>, url: String)
where
    C: StreamConnector,
{
    shared.set_phase(StreamPhase::Connecting);

    let connect = tokio::select! {
        _ = shared.cancel.cancelled() => {
            shared.set_phase(StreamPhase::Closed);
            return;
        }
        result = connector.connect(&url) => result,
    };

    let mut frames = match connect {
        Ok(frames) => frames,
        Err(e) => {
            tracing::warn!("Status stream for {} failed to open: {}", url, e);
            shared.set_phase(StreamPhase::Closed);
            return;
        }
    };

    shared.set_phase(StreamPhase::Open);

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(raw) => {
                    let event = {
                        let mut state = shared.state.lock().unwrap();
                        apply_frame(&mut state, &raw)
                    };
                    let _ = shared.events.send(event);
                }
                None => break, // server closed the stream
            },
        }
    }

    shared.set_phase(StreamPhase::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::{CompletionAction, TaskOutcome};
    use crate::ports::stream::{ConnectionError, MockStreamConnector};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_config() -> ClientConfig {
        ClientConfig::new("http://127.0.0.1:8888/api/v1", "ws://127.0.0.1:8888/api/v1")
    }

    /// Connector whose single connection yields frames from a channel the
    /// test holds the sending half of.
    fn channel_connector(capacity: usize) -> (MockStreamConnector, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let mut connector = MockStreamConnector::new();
        let mut slot = Some(rx);
        connector.expect_connect().times(1).returning(move |_| {
            let rx = slot.take().expect("connector reused");
            Box::pin(async move { Ok(rx) })
        });
        (connector, tx)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_observers_share_history_and_phase() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let first = registry.subscribe("task-1");
        let second = registry.subscribe("task-1");
        assert_eq!(registry.active_streams(), 1);

        wait_until(|| first.phase() == StreamPhase::Open).await;

        tx.send(String::from(r#"{"status": "running", "total_progress": 10}"#))
            .await
            .unwrap();
        tx.send(String::from(r#"{"status": "running", "total_progress": 55}"#))
            .await
            .unwrap();
        wait_until(|| first.history().len() == 2).await;

        assert_eq!(first.history(), second.history());
        assert_eq!(first.phase(), second.phase());
        assert_eq!(second.progress().display_percent, 55);
    }

    #[tokio::test]
    async fn test_late_observer_receives_accumulated_history() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let first = registry.subscribe("task-1");
        wait_until(|| first.phase() == StreamPhase::Open).await;

        tx.send(String::from(r#"{"status": "queued"}"#)).await.unwrap();
        tx.send(String::from(r#"{"status": "running", "total_progress": 30}"#))
            .await
            .unwrap();
        wait_until(|| first.history().len() == 2).await;

        let late = registry.subscribe("task-1");
        assert_eq!(late.history().len(), 2);
        assert_eq!(late.progress().display_percent, 30);
        assert!(!late.progress().is_loading);
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_end_subscription() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let handle = registry.subscribe("task-1");
        wait_until(|| handle.phase() == StreamPhase::Open).await;

        tx.send(String::from(r#"{"status": "running", "total_progress": 10}"#))
            .await
            .unwrap();
        tx.send(String::from("{{{ not json")).await.unwrap();
        tx.send(String::from(r#"{"status": "running", "total_progress": 20}"#))
            .await
            .unwrap();

        wait_until(|| handle.history().len() == 2).await;
        assert_eq!(handle.rejected_frames(), 1);
        assert_eq!(handle.phase(), StreamPhase::Open);
        assert_eq!(handle.progress().display_percent, 20);
    }

    #[tokio::test]
    async fn test_release_to_zero_then_resubscribe_starts_fresh() {
        let (first_tx, first_rx) = mpsc::channel::<String>(8);
        let (_second_tx, second_rx) = mpsc::channel::<String>(8);
        let mut connector = MockStreamConnector::new();
        let mut connections = vec![second_rx, first_rx];
        connector.expect_connect().times(2).returning(move |_| {
            let rx = connections.pop().expect("too many connects");
            Box::pin(async move { Ok(rx) })
        });

        let registry = SubscriptionRegistry::new(connector, test_config());

        let mut first = registry.subscribe("task-1");
        let mut second = registry.subscribe("task-1");
        wait_until(|| first.phase() == StreamPhase::Open).await;

        first_tx
            .send(String::from(r#"{"status": "running", "total_progress": 80}"#))
            .await
            .unwrap();
        wait_until(|| first.history().len() == 1).await;

        registry.release(&mut first);
        // One observer left: the stream stays up
        assert_eq!(registry.active_streams(), 1);
        assert_eq!(second.phase(), StreamPhase::Open);

        registry.release(&mut second);
        wait_until(|| second.phase() == StreamPhase::Closed).await;
        assert_eq!(registry.active_streams(), 0);

        let fresh = registry.subscribe("task-1");
        assert!(fresh.history().is_empty());
        assert!(fresh.progress().is_loading);
        wait_until(|| fresh.phase() == StreamPhase::Open).await;
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let mut first = registry.subscribe("task-1");
        let second = registry.subscribe("task-1");
        wait_until(|| first.phase() == StreamPhase::Open).await;

        registry.release(&mut first);
        registry.release(&mut first);
        registry.release(&mut first);

        // The double release must not tear down the remaining observer
        assert_eq!(registry.active_streams(), 1);
        tx.send(String::from(r#"{"status": "running", "total_progress": 5}"#))
            .await
            .unwrap();
        wait_until(|| second.history().len() == 1).await;
        assert_eq!(second.phase(), StreamPhase::Open);
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_as_closed() {
        let mut connector = MockStreamConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Box::pin(async { Err(ConnectionError::Timeout) }));

        let registry = SubscriptionRegistry::new(connector, test_config());
        let handle = registry.subscribe("task-1");
        wait_until(|| handle.phase() == StreamPhase::Closed).await;
        assert!(handle.history().is_empty());
    }

    #[tokio::test]
    async fn test_server_close_marks_stream_closed() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let handle = registry.subscribe("task-1");
        wait_until(|| handle.phase() == StreamPhase::Open).await;

        tx.send(String::from(r#"{"status": "running", "total_progress": 99}"#))
            .await
            .unwrap();
        drop(tx);

        wait_until(|| handle.phase() == StreamPhase::Closed).await;
        // History survives the close
        assert_eq!(handle.history().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_message_resolves_outcome() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let handle = registry.subscribe("task-7");
        wait_until(|| handle.phase() == StreamPhase::Open).await;

        for frame in [
            r#"{"status": "running", "total_progress": 10}"#,
            r#"{"status": "running", "total_progress": 55}"#,
            r#"{"status": "finished", "total_progress": 100,
                "payload": {"type": "file", "file_path": "out.mp4"}}"#,
        ] {
            tx.send(String::from(frame)).await.unwrap();
        }
        wait_until(|| handle.history().len() == 3).await;

        assert!(handle.is_terminal());
        assert_eq!(handle.progress().display_percent, 100);
        assert_eq!(
            handle.outcome(&test_config()),
            TaskOutcome::Succeeded {
                action: Some(CompletionAction::Download(String::from(
                    "http://127.0.0.1:8888/api/v1/task/task-7/download/out.mp4"
                )))
            }
        );
    }

    #[tokio::test]
    async fn test_distinct_tasks_get_distinct_streams() {
        let (a_tx, a_rx) = mpsc::channel::<String>(8);
        let (_b_tx, b_rx) = mpsc::channel::<String>(8);
        let mut connector = MockStreamConnector::new();
        // The two drivers race to connect; hand out receivers by url
        let mut connections = std::collections::HashMap::from([
            (String::from("ws://127.0.0.1:8888/api/v1/task/task-a"), a_rx),
            (String::from("ws://127.0.0.1:8888/api/v1/task/task-b"), b_rx),
        ]);
        connector.expect_connect().times(2).returning(move |url| {
            let rx = connections.remove(url).expect("unexpected stream url");
            Box::pin(async move { Ok(rx) })
        });

        let registry = SubscriptionRegistry::new(connector, test_config());
        let a = registry.subscribe("task-a");
        let b = registry.subscribe("task-b");
        assert_eq!(registry.active_streams(), 2);

        wait_until(|| a.phase() == StreamPhase::Open && b.phase() == StreamPhase::Open).await;
        a_tx.send(String::from(r#"{"status": "running", "total_progress": 40}"#))
            .await
            .unwrap();
        wait_until(|| a.history().len() == 1).await;

        assert!(b.history().is_empty());
    }

    #[tokio::test]
    async fn test_events_notify_observers() {
        let (connector, tx) = channel_connector(8);
        let registry = SubscriptionRegistry::new(connector, test_config());

        let handle = registry.subscribe("task-1");
        let mut events = handle.events();
        wait_until(|| handle.phase() == StreamPhase::Open).await;

        tx.send(String::from(r#"{"status": "running", "total_progress": 10}"#))
            .await
            .unwrap();

        let appended = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(StreamEvent::MessageAppended(message)) => break message,
                    Ok(_) => continue,
                    Err(e) => panic!("event channel failed: {}", e),
                }
            }
        })
        .await
        .expect("no MessageAppended event");
        assert_eq!(appended.total_progress, 10);
    }
}
