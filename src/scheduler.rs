//! Adaptive refresh scheduling — two-speed polling with debounced push.
//!
//! DESIGN
//! ======
//! Polling starts at a fast interval and, once enough consecutive polls see
//! no change in the message count, drops to a slow interval until activity
//! resumes. The pure decision logic lives in [`PollPolicy`] so it tests
//! without timers; [`RefreshScheduler`] is the tokio task around it.
//!
//! The loop awaits each refresh before arming the next sleep, so at most one
//! poll is ever in flight. Out-of-band triggers (push notifications, or
//! anything holding a [`RefreshTrigger`]) are debounced: a burst collapses
//! into a single fetch once the window goes quiet.
//!
//! TRADE-OFFS
//! ==========
//! A failed refresh leaves the policy state untouched rather than counting
//! as "unchanged": backing off because the host is erroring would slow
//! recovery exactly when the next poll is most likely to matter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::ChatSession;
use crate::store::{PushBridge, PushEvent};

const DEFAULT_FAST_POLL_MS: u64 = 3_000;
const DEFAULT_SLOW_POLL_MS: u64 = 15_000;
const DEFAULT_UNCHANGED_THRESHOLD: u32 = 40;
const DEFAULT_PUSH_DEBOUNCE_MS: u64 = 300;

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// CONFIG
// =============================================================================

/// Tuning knobs for the refresh scheduler.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Interval while the conversation looks active.
    pub fast: Duration,
    /// Interval after the unchanged threshold is exceeded.
    pub slow: Duration,
    /// Consecutive unchanged polls tolerated before slowing down.
    pub unchanged_threshold: u32,
    /// Quiet window that ends a push burst.
    pub debounce: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(DEFAULT_FAST_POLL_MS),
            slow: Duration::from_millis(DEFAULT_SLOW_POLL_MS),
            unchanged_threshold: DEFAULT_UNCHANGED_THRESHOLD,
            debounce: Duration::from_millis(DEFAULT_PUSH_DEBOUNCE_MS),
        }
    }
}

impl PollConfig {
    /// Defaults overridden by `TASKCHAT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            fast: Duration::from_millis(env_parse("TASKCHAT_POLL_FAST_MS", DEFAULT_FAST_POLL_MS)),
            slow: Duration::from_millis(env_parse("TASKCHAT_POLL_SLOW_MS", DEFAULT_SLOW_POLL_MS)),
            unchanged_threshold: env_parse("TASKCHAT_POLL_UNCHANGED_THRESHOLD", DEFAULT_UNCHANGED_THRESHOLD),
            debounce: Duration::from_millis(env_parse("TASKCHAT_PUSH_DEBOUNCE_MS", DEFAULT_PUSH_DEBOUNCE_MS)),
        }
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Pure two-speed polling policy: message-count change detection decides
/// the current interval.
#[derive(Debug)]
pub struct PollPolicy {
    fast: Duration,
    slow: Duration,
    unchanged_threshold: u32,
    interval: Duration,
    unchanged: u32,
    last_count: Option<usize>,
}

impl PollPolicy {
    #[must_use]
    pub fn new(config: &PollConfig) -> Self {
        Self {
            fast: config.fast,
            slow: config.slow,
            unchanged_threshold: config.unchanged_threshold,
            interval: config.fast,
            unchanged: 0,
            last_count: None,
        }
    }

    /// Interval to sleep before the next poll.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record the message count observed by a completed refresh and return
    /// the updated interval.
    ///
    /// A changed count resets to the fast interval and zeroes the unchanged
    /// counter; once the counter exceeds the threshold, the interval drops
    /// to slow and stays there until a change is observed. The first poll
    /// after construction counts as a change.
    pub fn record(&mut self, count: usize) -> Duration {
        match self.last_count {
            Some(prev) if prev == count => {
                self.unchanged += 1;
                if self.unchanged > self.unchanged_threshold && self.interval != self.slow {
                    debug!(unchanged = self.unchanged, "conversation idle; slowing poll interval");
                    self.interval = self.slow;
                }
            }
            _ => {
                self.unchanged = 0;
                self.interval = self.fast;
            }
        }
        self.last_count = Some(count);
        self.interval
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Clonable handle that requests an out-of-band, debounced refresh.
#[derive(Clone)]
pub struct RefreshTrigger {
    tx: mpsc::UnboundedSender<PushEvent>,
}

impl RefreshTrigger {
    /// Request a refresh. Bursts collapse into one fetch; a notify after the
    /// scheduler stopped is silently dropped.
    pub fn notify(&self) {
        let _ = self.tx.send(PushEvent);
    }
}

/// Owner of the automatic refresh timer for one session.
///
/// Stopping (or dropping) the scheduler cancels the poll loop and any
/// debounce in progress; no callback fires against a stopped scheduler.
pub struct RefreshScheduler {
    poll_task: JoinHandle<()>,
    forward_task: Option<JoinHandle<()>>,
    trigger: RefreshTrigger,
}

impl RefreshScheduler {
    /// Spawn the poll loop for `session`.
    #[must_use]
    pub fn spawn(session: Arc<ChatSession>, config: PollConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        info!(?config, "refresh scheduler configured");
        let poll_task = tokio::spawn(poll_loop(session, config, rx));
        Self { poll_task, forward_task: None, trigger: RefreshTrigger { tx } }
    }

    /// Spawn the poll loop and wire a push bridge into the trigger path.
    ///
    /// If the session is unbound or the subscription fails, the scheduler
    /// degrades to polling alone — push is an accelerator, not a dependency.
    pub async fn spawn_with_push(
        session: Arc<ChatSession>,
        config: PollConfig,
        bridge: Arc<dyn PushBridge>,
    ) -> Self {
        let mut scheduler = Self::spawn(Arc::clone(&session), config);
        let Some(channel) = session.channel().await else {
            return scheduler;
        };
        match bridge.subscribe(channel).await {
            Ok(mut events) => {
                let trigger = scheduler.trigger.clone();
                scheduler.forward_task = Some(tokio::spawn(async move {
                    while events.recv().await.is_some() {
                        trigger.notify();
                    }
                    debug!(%channel, "push subscription ended; polling continues");
                }));
            }
            Err(e) => {
                warn!(%channel, error = %e, "push subscribe failed; polling continues");
            }
        }
        scheduler
    }

    /// Handle for out-of-band refresh requests.
    #[must_use]
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Cancel the poll loop and any push forwarding.
    pub fn stop(&self) {
        self.poll_task.abort();
        if let Some(task) = &self.forward_task {
            task.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(session: Arc<ChatSession>, config: PollConfig, mut rx: mpsc::UnboundedReceiver<PushEvent>) {
    let mut policy = PollPolicy::new(&config);
    let mut push_open = true;
    loop {
        if push_open {
            tokio::select! {
                () = tokio::time::sleep(policy.interval()) => {}
                event = rx.recv() => {
                    if event.is_none() {
                        push_open = false;
                        continue;
                    }
                    debounce_burst(&mut rx, config.debounce).await;
                }
            }
        } else {
            tokio::time::sleep(policy.interval()).await;
        }

        match session.refresh().await {
            Ok(count) => {
                policy.record(count);
            }
            Err(e) => {
                // Policy untouched: an erroring host is not an idle one.
                debug!(error = %e, "scheduled refresh failed");
            }
        }
    }
}

/// Wait out a trigger burst: every further event restarts the quiet window.
async fn debounce_burst(rx: &mut mpsc::UnboundedReceiver<PushEvent>, window: Duration) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(window) => break,
            event = rx.recv() => {
                if event.is_none() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
