use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channel::ChannelId;
use crate::error::ChatResult;
use crate::message::{FilePayload, Message, PendingAttachment};
use crate::store::{AttachmentClient, MessageStoreClient};

// =============================================================================
// PollPolicy
// =============================================================================

fn policy() -> PollPolicy {
    PollPolicy::new(&PollConfig::default())
}

#[test]
fn policy_starts_at_fast_interval() {
    assert_eq!(policy().interval(), Duration::from_millis(3_000));
}

#[test]
fn first_poll_counts_as_a_change() {
    let mut p = policy();
    assert_eq!(p.record(0), Duration::from_millis(3_000));
}

#[test]
fn stays_fast_up_to_the_unchanged_threshold() {
    let mut p = policy();
    p.record(5);
    for _ in 0..40 {
        assert_eq!(p.record(5), Duration::from_millis(3_000));
    }
}

#[test]
fn slows_down_exactly_once_after_exceeding_threshold() {
    let mut p = policy();
    p.record(5);
    let mut transitions = 0;
    let mut previous = p.interval();
    for _ in 0..60 {
        let interval = p.record(5);
        if interval != previous {
            transitions += 1;
            previous = interval;
        }
    }
    assert_eq!(p.interval(), Duration::from_millis(15_000));
    assert_eq!(transitions, 1);
}

#[test]
fn change_resets_interval_and_counter() {
    let mut p = policy();
    p.record(5);
    for _ in 0..41 {
        p.record(5);
    }
    assert_eq!(p.interval(), Duration::from_millis(15_000));

    // New message arrives: back to fast immediately.
    assert_eq!(p.record(6), Duration::from_millis(3_000));

    // The counter restarted: 40 more unchanged polls stay fast.
    for _ in 0..40 {
        assert_eq!(p.record(6), Duration::from_millis(3_000));
    }
    assert_eq!(p.record(6), Duration::from_millis(15_000));
}

#[test]
fn custom_config_is_respected() {
    let config = PollConfig {
        fast: Duration::from_millis(100),
        slow: Duration::from_millis(900),
        unchanged_threshold: 2,
        debounce: Duration::from_millis(10),
    };
    let mut p = PollPolicy::new(&config);
    p.record(1);
    p.record(1);
    p.record(1);
    assert_eq!(p.interval(), Duration::from_millis(100));
    assert_eq!(p.record(1), Duration::from_millis(900));
}

// =============================================================================
// Scheduler loop (paused clock)
// =============================================================================

struct CountingStore {
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MessageStoreClient for CountingStore {
    async fn fetch_history(&self, _channel: ChannelId, _limit: u32) -> ChatResult<Vec<Message>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn post_message(&self, _channel: ChannelId, _body: &str, _ids: &[i64]) -> ChatResult<()> {
        Ok(())
    }
}

struct NoopUploader;

#[async_trait::async_trait]
impl AttachmentClient for NoopUploader {
    async fn upload(&self, _channel: ChannelId, file: &FilePayload) -> ChatResult<PendingAttachment> {
        Ok(PendingAttachment { id: 1, name: file.name.clone(), mimetype: file.mimetype.clone(), file_size: file.size() })
    }
}

async fn bound_session(store: &Arc<CountingStore>) -> Arc<ChatSession> {
    let store_client: Arc<dyn MessageStoreClient> = (*store).clone();
    let uploads: Arc<dyn AttachmentClient> = Arc::new(NoopUploader);
    let session = Arc::new(ChatSession::new(store_client, uploads));
    session.bind(ChannelId::new(1)).await.unwrap();
    session
}

/// Let spawned tasks run up to their next timer without advancing the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn polls_at_the_fast_interval() {
    let store = CountingStore::new();
    let session = bound_session(&store).await;
    let baseline = store.calls();

    let scheduler = RefreshScheduler::spawn(session, PollConfig::default());
    settle().await;

    tokio::time::advance(Duration::from_millis(3_000)).await;
    settle().await;
    assert_eq!(store.calls(), baseline + 1);

    tokio::time::advance(Duration::from_millis(3_000)).await;
    settle().await;
    assert_eq!(store.calls(), baseline + 2);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_poll_loop() {
    let store = CountingStore::new();
    let session = bound_session(&store).await;
    let baseline = store.calls();

    let scheduler = RefreshScheduler::spawn(session, PollConfig::default());
    settle().await;
    scheduler.stop();
    settle().await;

    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    assert_eq!(store.calls(), baseline, "no poll may fire after stop");
}

#[tokio::test(start_paused = true)]
async fn trigger_burst_collapses_into_one_refresh() {
    let store = CountingStore::new();
    let session = bound_session(&store).await;
    let baseline = store.calls();

    let scheduler = RefreshScheduler::spawn(session, PollConfig::default());
    settle().await;

    let trigger = scheduler.trigger();
    trigger.notify();
    trigger.notify();
    trigger.notify();
    settle().await;

    // Inside the debounce window nothing has fired yet.
    assert_eq!(store.calls(), baseline);

    tokio::time::advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(store.calls(), baseline + 1, "a burst must collapse into a single fetch");

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn notify_after_stop_is_dropped() {
    let store = CountingStore::new();
    let session = bound_session(&store).await;
    let baseline = store.calls();

    let scheduler = RefreshScheduler::spawn(session, PollConfig::default());
    settle().await;
    let trigger = scheduler.trigger();
    scheduler.stop();
    settle().await;

    trigger.notify();
    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(store.calls(), baseline);
}

// =============================================================================
// Push bridge forwarding
// =============================================================================

struct ChannelBridge {
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<PushEvent>>>,
}

impl ChannelBridge {
    fn new() -> Arc<Self> {
        Arc::new(Self { sender: std::sync::Mutex::new(None) })
    }

    fn push(&self) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            let _ = tx.send(PushEvent);
        }
    }
}

#[async_trait::async_trait]
impl PushBridge for ChannelBridge {
    async fn subscribe(&self, _channel: ChannelId) -> ChatResult<mpsc::UnboundedReceiver<PushEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

#[tokio::test(start_paused = true)]
async fn push_events_cause_a_debounced_refresh() {
    let store = CountingStore::new();
    let session = bound_session(&store).await;
    let baseline = store.calls();

    let bridge = ChannelBridge::new();
    let bridge_client: Arc<dyn PushBridge> = bridge.clone();
    let scheduler = RefreshScheduler::spawn_with_push(session, PollConfig::default(), bridge_client).await;
    settle().await;

    bridge.push();
    bridge.push();
    settle().await;
    tokio::time::advance(Duration::from_millis(300)).await;
    settle().await;

    assert_eq!(store.calls(), baseline + 1);

    scheduler.stop();
}
